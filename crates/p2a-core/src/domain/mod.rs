//! 신원 관리를 위한 도메인 모델.

mod profile;
mod role;
mod token;
mod user;

pub use profile::*;
pub use role::*;
pub use token::*;
pub use user::*;
