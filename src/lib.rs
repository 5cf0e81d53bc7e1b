pub mod backend;
pub mod cmd_list;
pub mod cmd_list_manager;
pub mod command_buffer;
pub mod context;
pub mod deferred;
pub mod device;
pub mod driver;
pub mod headless;
pub mod resource;
pub mod sync;
pub mod types;
