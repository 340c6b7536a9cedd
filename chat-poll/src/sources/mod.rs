pub mod channel_source;
pub mod reader_source;

pub use channel_source::ChannelLineSource;
pub use reader_source::ReaderLineSource;
