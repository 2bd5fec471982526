pub mod pose_detector;
pub mod thumbnail_generator;
pub mod video_reader;
