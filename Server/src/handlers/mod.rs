pub mod crossdomain;
pub mod dash;
