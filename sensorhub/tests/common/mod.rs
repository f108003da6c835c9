pub mod broker;
pub mod mock_app;
