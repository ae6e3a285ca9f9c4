pub mod authenticate_use_case;
pub mod domain;
pub mod match_session;
pub mod session_logger;
