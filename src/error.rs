#[repr(i32)]
pub enum ExitCode {
    Config = 1,
    Background = 2,
    Compositor = 3,
    MainContext = 4,
}

pub const ERR_CHANNEL_SEND: &str = "Failed to send message to channel";
pub const ERR_MAIN_CONTEXT: &str = "Failed to acquire the default main context";
pub const ERR_MUTEX_LOCK: &str = "Failed to get lock on Mutex";
