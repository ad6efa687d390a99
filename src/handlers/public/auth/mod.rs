// handlers/public/auth/mod.rs - account creation, login and password recovery

pub mod login;
pub mod password;
pub mod register;

pub use login::login_post;
pub use password::{forgot_post, reset_post};
pub use register::register_post;
