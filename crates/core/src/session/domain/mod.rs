pub mod authentication_result;
pub mod decision_policy;
pub mod session_config;
pub mod vote_tally;
