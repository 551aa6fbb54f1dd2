pub mod device_server;
