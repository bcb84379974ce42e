use indicatif::{ProgressBar, ProgressStyle};
use portrait_stylize::{PipelineProgress, ProgressUpdate};

pub struct StageProgress {
    pb: ProgressBar,
}

impl StageProgress {
    pub fn new() -> Self {
        let sty = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        let pb = ProgressBar::new(1);
        pb.set_style(sty);

        // The models can take a while, keep the timer ticking between stages
        pb.enable_steady_tick(std::time::Duration::from_millis(250));

        Self { pb }
    }
}

impl Drop for StageProgress {
    fn drop(&mut self) {
        self.pb.finish();
    }
}

impl PipelineProgress for StageProgress {
    fn update(&mut self, update: ProgressUpdate) {
        self.pb.set_length(update.total.total as u64);
        self.pb.set_position(update.total.current as u64);
        self.pb.set_message(update.stage.to_string());
    }
}
