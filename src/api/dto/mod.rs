pub mod auth;
pub mod responses;

// Re-export commonly used types
pub use auth::{
    AdminCheckResponse, AdminLoginRequest, AdminSignupRequest, ChangePasswordRequest,
    ForgetPasswordRequest, LoginRequest, LoginResponse, ResendRequest, ResetPasswordRequest,
    SignupRequest, SignupResponse, UserResponse, VerifyQuery, VerifySignupRequest,
    VerifySignupResponse,
};
pub use responses::{ErrorResponse, MessageResponse, SuccessResponse};
