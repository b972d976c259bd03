pub mod github_proxy;
pub mod wrapped;
