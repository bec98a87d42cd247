use super::sanitize::sanitize_message;
use super::Reporter;
use crate::error::Result;
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};

/// Error attached to a failed test by the host engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestError {
    pub message: String,
    pub stack: Option<String>,
}

impl TestError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: &str) -> Self {
        self.stack = Some(stack.to_string());
        self
    }
}

/// The engine's view of one test, as delivered with lifecycle notifications
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestInfo {
    pub title: String,
    /// Parent suite / describe-block label
    pub parent: Option<String>,
    pub error: Option<TestError>,
    /// Engine-assigned id, stable across retries of the same test
    pub uid: Option<String>,
}

impl TestInfo {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_uid(mut self, uid: &str) -> Self {
        self.uid = Some(uid.to_string());
        self
    }

    pub fn with_error(mut self, error: TestError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Lifecycle notifications from the host test engine
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    TestStarted(TestInfo),
    TestPassed(TestInfo),
    TestFailed(TestInfo),
    /// Raw stdout chunk written by the spec under test
    Stdout(String),
    RunnerEnded,
}

/// Event emitter the host engine uses to broadcast lifecycle events.
///
/// The reporter is fed through an unbounded mpsc channel so that no
/// pass/fail notification is ever dropped. Console subscribers share a
/// broadcast ring and may miss events when they fall behind.
pub struct EventEmitter {
    reporter: mpsc::UnboundedSender<RunnerEvent>,
    sender: broadcast::Sender<RunnerEvent>,
}

impl EventEmitter {
    /// Create an emitter and the receiving end to hand to [`drive`]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunnerEvent>) {
        let (reporter, receiver) = mpsc::unbounded_channel();
        let (sender, _) = broadcast::channel(256);
        (Self { reporter, sender }, receiver)
    }

    pub fn emit(&self, event: RunnerEvent) {
        if self.reporter.send(event.clone()).is_err() {
            log::warn!("Reporter is gone, event not recorded");
        }
        let _ = self.sender.send(event);
    }

    /// Lossy subscription for console output
    pub fn subscribe(&self) -> broadcast::Receiver<RunnerEvent> {
        self.sender.subscribe()
    }
}

/// Forward events to `reporter` in arrival order.
///
/// Returns the written report path once `RunnerEnded` is handled, or
/// `None` if every emitter was dropped before the run ended.
pub async fn drive<R>(
    mut receiver: mpsc::UnboundedReceiver<RunnerEvent>,
    reporter: &mut R,
) -> Result<Option<PathBuf>>
where
    R: Reporter + ?Sized,
{
    while let Some(event) = receiver.recv().await {
        match event {
            RunnerEvent::TestStarted(test) => reporter.on_test_start(&test),
            RunnerEvent::Stdout(chunk) => reporter.on_stdout(&chunk),
            RunnerEvent::TestPassed(test) => reporter.on_test_pass(&test).await,
            RunnerEvent::TestFailed(test) => reporter.on_test_fail(&test).await,
            RunnerEvent::RunnerEnded => return reporter.on_runner_end().await.map(Some),
        }
    }
    Ok(None)
}

/// Console event listener printing one line per finished test
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<RunnerEvent>) {
        use colored::Colorize;

        let mut passed = 0u32;
        let mut failed = 0u32;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                RunnerEvent::TestPassed(test) => {
                    passed += 1;
                    println!("  {} {}", "✓".green(), display_name(&test));
                }
                RunnerEvent::TestFailed(test) => {
                    failed += 1;
                    println!("  {} {}", "✗".red(), display_name(&test));
                    if let Some(error) = &test.error {
                        println!("      {}", sanitize_message(&error.message).dimmed());
                    }
                }
                RunnerEvent::RunnerEnded => {
                    println!(
                        "\n{} {} passed, {} failed ({} total)",
                        "■".blue().bold(),
                        passed.to_string().green(),
                        failed.to_string().red(),
                        passed + failed
                    );
                    break;
                }
                RunnerEvent::TestStarted(_) | RunnerEvent::Stdout(_) => {}
            }
        }
    }
}

fn display_name(test: &TestInfo) -> String {
    match test.parent.as_deref().map(str::trim) {
        Some(parent) if !parent.is_empty() => format!("{} › {}", parent, test.title),
        _ => test.title.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingReporter {
        calls: Vec<String>,
    }

    #[async_trait]
    impl Reporter for RecordingReporter {
        fn on_test_start(&mut self, test: &TestInfo) {
            self.calls.push(format!("start:{}", test.title));
        }

        fn on_stdout(&mut self, chunk: &str) {
            self.calls.push(format!("stdout:{}", chunk));
        }

        async fn on_test_pass(&mut self, test: &TestInfo) {
            self.calls.push(format!("pass:{}", test.title));
        }

        async fn on_test_fail(&mut self, test: &TestInfo) {
            self.calls.push(format!("fail:{}", test.title));
        }

        async fn on_runner_end(&mut self) -> Result<PathBuf> {
            self.calls.push("end".to_string());
            Ok(PathBuf::from("report.json"))
        }
    }

    #[tokio::test]
    async fn test_drive_forwards_in_order() {
        let (emitter, receiver) = EventEmitter::new();
        emitter.emit(RunnerEvent::TestStarted(TestInfo::new("a")));
        emitter.emit(RunnerEvent::Stdout("hello".to_string()));
        emitter.emit(RunnerEvent::TestPassed(TestInfo::new("a")));
        emitter.emit(RunnerEvent::TestStarted(TestInfo::new("b")));
        emitter.emit(RunnerEvent::TestFailed(TestInfo::new("b")));
        emitter.emit(RunnerEvent::RunnerEnded);

        let mut reporter = RecordingReporter::default();
        let path = drive(receiver, &mut reporter).await.unwrap();

        assert_eq!(path, Some(PathBuf::from("report.json")));
        assert_eq!(
            reporter.calls,
            vec![
                "start:a",
                "stdout:hello",
                "pass:a",
                "start:b",
                "fail:b",
                "end"
            ]
        );
    }

    #[tokio::test]
    async fn test_drive_without_run_end() {
        let (emitter, receiver) = EventEmitter::new();
        emitter.emit(RunnerEvent::TestPassed(TestInfo::new("a")));
        drop(emitter);

        let mut reporter = RecordingReporter::default();
        let path = drive(receiver, &mut reporter).await.unwrap();

        assert!(path.is_none());
        assert_eq!(reporter.calls, vec!["pass:a"]);
    }

    #[tokio::test]
    async fn test_drive_is_lossless_under_heavy_output() {
        let (emitter, receiver) = EventEmitter::new();
        let console = emitter.subscribe();
        emitter.emit(RunnerEvent::TestPassed(TestInfo::new("first")));
        for i in 0..1000 {
            emitter.emit(RunnerEvent::Stdout(format!("line {}", i)));
        }
        emitter.emit(RunnerEvent::TestFailed(TestInfo::new("second")));
        emitter.emit(RunnerEvent::RunnerEnded);
        drop(emitter);

        let mut reporter = RecordingReporter::default();
        drive(receiver, &mut reporter).await.unwrap();

        assert_eq!(reporter.calls.len(), 1003);
        assert_eq!(reporter.calls[0], "pass:first");
        assert_eq!(reporter.calls[1001], "fail:second");

        // the console ring overflowed but its listener still finishes
        ConsoleEventListener::listen(console).await;
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(&TestInfo::new("t")), "t");
        assert_eq!(
            display_name(&TestInfo::new("t").with_parent("  Login ")),
            "Login › t"
        );
    }
}
