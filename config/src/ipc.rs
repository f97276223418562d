/// Capacity of the pipe ring buffer.
pub const PIPE_BUF_LEN: usize = 1024;
