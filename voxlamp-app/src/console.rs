//! Console observer: prints wake detections and inference blocks to stdout.

use voxlamp_core::engine::pipeline::PipelineObserver;
use voxlamp_core::events::{UtteranceEvent, WakeEvent};
use voxlamp_core::recognition::Inference;

#[derive(Debug, Default)]
pub struct ConsoleObserver {
    /// Also emit each event as one JSON line after the block.
    pub json: bool,
}

impl ConsoleObserver {
    fn render_utterance(&self, seq: u64, inference: &Inference<'_>) -> String {
        let event = UtteranceEvent::from_inference(seq, inference);
        let mut out = event.to_string();
        if self.json {
            if let Ok(line) = serde_json::to_string(&event) {
                out.push('\n');
                out.push_str(&line);
            }
        }
        out
    }
}

impl PipelineObserver for ConsoleObserver {
    fn on_wake_detected(&mut self, event: &WakeEvent) {
        println!("[wake word]");
        if self.json {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
        }
    }

    fn on_utterance_result(&mut self, seq: u64, inference: &Inference<'_>) {
        println!("{}", self.render_utterance(seq, inference));
    }
}
