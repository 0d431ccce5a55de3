//! Terminal formatting for stream metadata and session progress.

use oggbridge_core::{PlayerStatus, RecorderStatus, StreamInfo};

/// `m:ss`, or `h:mm:ss` past an hour.
pub fn format_clock(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds / 60) % 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

pub fn format_duration(info: &StreamInfo) -> String {
    info.duration().map_or_else(|| "unknown".to_string(), format_clock)
}

pub fn print_stream_info(info: &StreamInfo) {
    println!("Sample rate: {} Hz", info.sample_rate);
    println!("Channels:    {}", info.channels);
    println!("Vendor:      {}", info.vendor);
    println!("Duration:    {}", format_duration(info));
}

pub fn describe_player_status(status: PlayerStatus) -> String {
    match status {
        PlayerStatus::Started => "reading header".into(),
        PlayerStatus::Stopped => "stopped".into(),
        PlayerStatus::Finished => "finished".into(),
        PlayerStatus::Failed(code) => format!("failed: {code} ({})", code.code()),
    }
}

pub fn describe_recorder_status(status: RecorderStatus) -> String {
    match status {
        RecorderStatus::Started => "recording".into(),
        RecorderStatus::Stopped => "stopped".into(),
        RecorderStatus::Finished => "finished".into(),
        RecorderStatus::Failed(code) => format!("failed: {code} ({})", code.code()),
    }
}
