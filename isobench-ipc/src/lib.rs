#![warn(missing_docs)]
//! isobench IPC Protocol
//!
//! Wire format for moving a single trial outcome from the forked child back
//! to the parent. Uses rkyv with byte validation so a corrupted or truncated
//! payload is rejected instead of trusted.

mod framing;
mod messages;

pub use framing::{FrameError, FrameWriter, MAX_FRAME_SIZE, decode_frame, read_frame, write_frame};
pub use messages::TrialOutcome;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_survives_pipe_framing() {
        let mut buffer = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buffer);
            writer.write(&TrialOutcome::elapsed(0.5)).unwrap();
        }

        let decoded: TrialOutcome = decode_frame(&buffer).unwrap();
        assert_eq!(decoded, TrialOutcome::Elapsed { seconds: 0.5 });
    }
}
