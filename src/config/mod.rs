mod builder;
mod defaults;
mod environment;
mod keys;
mod logger;
mod sentry;

pub use self::builder::Config;
pub use self::environment::Environment;
pub use self::keys::KeyMaterial;
