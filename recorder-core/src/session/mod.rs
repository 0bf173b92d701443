pub(crate) mod audio_loop;
pub mod recorder;
pub(crate) mod video_loop;

pub use recorder::Recorder;
