use paintkit::{
    run_producer, BufferedTransport, Config, Dispatcher, DryRunPort, FileSource, PaintSession,
    SerialPort, ShutdownSignal, StrokeBatch, TransportConfig,
};
use paintkit_settings::SourceKind;
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const HOLDERS: &str = r#"[
    {"index": 0, "colorIdx": "1 red", "x": 100, "y": 20,
     "brushes": [{"size": "3"}, {"size": "2"}, {"size": "1"}]},
    {"index": 1, "colorIdx": "2 blue", "x": 230, "y": 20,
     "brushes": [{"size": "3"}, {"size": "2"}, {"size": "1"}]}
]"#;

fn stroke_line(color: &str, y: f64) -> String {
    let data: Vec<String> = (0..=20)
        .map(|i| format!("{} {} 0.5 120", 200.0 + 10.0 * i as f64, y))
        .collect();
    serde_json::json!({"color": color, "size": "3 12", "data": data}).to_string()
}

fn config_in(dir: &Path) -> Config {
    let holders = dir.join("holders.json");
    std::fs::write(&holders, HOLDERS).unwrap();

    let mut config = Config::default();
    config.session.holders_file = Some(holders);
    config.session.canvas_path = Some(dir.join("canvas.png"));
    config.connection.source = SourceKind::File;
    config.connection.replay_file = Some(dir.join("strokes.jsonl"));
    config
}

#[tokio::test]
async fn test_replay_dry_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let replay = config.connection.replay_file.clone().unwrap();
    std::fs::write(
        &replay,
        format!(
            "{}\n{}\nnot a stroke\n{}\n",
            stroke_line("1 0xff000000", 500.0),
            stroke_line("1 0xff000000", 520.0),
            stroke_line("2 0xff0000ff", 540.0),
        ),
    )
    .unwrap();

    let output = dir.path().join("out.gcode");
    let session = PaintSession::from_config(&config).unwrap();
    let transport = BufferedTransport::new(
        Box::new(DryRunPort::with_output(&output).unwrap()),
        TransportConfig::immediate(),
    );
    let dispatcher =
        Dispatcher::new(session, transport).with_canvas_path(config.session.canvas_path.clone());

    let shutdown = ShutdownSignal::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let consumer = {
        let shutdown = shutdown.clone();
        std::thread::spawn(move || dispatcher.run(rx, shutdown))
    };

    let source = FileSource::open(&replay).await.unwrap();
    run_producer(Box::new(source), tx, shutdown.clone()).await;

    let report = tokio::task::spawn_blocking(move || consumer.join().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.painted, 3);
    assert_eq!(report.rejected, 0);
    assert_eq!(report.faults, 0);

    let gcode = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = gcode.lines().collect();
    assert_eq!(&lines[..2], &["$H", "$?"]);
    assert_eq!(&lines[lines.len() - 2..], &["$H", "$?"]);
    assert!(lines[2..lines.len() - 2].iter().all(|l| l.starts_with("G1 ")));
    // stroke points are mirrored on Y and negated into machine coordinates
    assert!(gcode.contains("X-200.000 Y-698.000"));
    assert!(dir.path().join("canvas.png").exists());
}

#[tokio::test]
async fn test_out_of_bounds_stroke_is_rejected_not_sent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let session = PaintSession::from_config(&config).unwrap();

    let written = Arc::new(Mutex::new(Vec::<u8>::new()));
    let transport = BufferedTransport::new(
        Box::new(DryRunPort::with_writer(Box::new(SharedWriter(written.clone())))),
        TransportConfig::immediate(),
    );
    let mut dispatcher = Dispatcher::new(session, transport);
    dispatcher.connect().unwrap();

    let far = StrokeBatch::from_wire(
        r#"{"color": "1 a", "size": "3 12", "data": ["900 500 0 100", "950 500 0 100"]}"#,
    )
    .unwrap();
    dispatcher.handle(&far).unwrap();

    assert_eq!(dispatcher.report().rejected, 1);
    assert!(dispatcher.session().hand().current_brush.is_none());
    let sent = String::from_utf8(written.lock().unwrap().clone()).unwrap();
    assert!(!sent.contains("G1"));
}

#[test]
fn test_alarm_rehomes_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let session = PaintSession::from_config(&config).unwrap();

    let controller = Arc::new(Mutex::new(AlarmOnce::default()));
    let transport = BufferedTransport::new(
        Box::new(AlarmPort(controller.clone())),
        TransportConfig::immediate(),
    );
    let mut dispatcher = Dispatcher::new(session, transport);
    dispatcher.connect().unwrap();

    let stroke = StrokeBatch::from_wire(&stroke_line("1 0xff000000", 500.0)).unwrap();
    dispatcher.handle(&stroke).unwrap();
    assert_eq!(dispatcher.report().faults, 1);
    assert!(dispatcher.transport().is_ready());

    dispatcher.handle(&stroke).unwrap();
    let report = dispatcher.report();
    assert_eq!(report.painted, 1);
    assert_eq!(report.faults, 1);

    // connect, re-home after the alarm
    let homes = controller
        .lock()
        .unwrap()
        .written
        .iter()
        .filter(|l| l.as_str() == "$H")
        .count();
    assert_eq!(homes, 2);
}

struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Controller that raises an alarm on the first motion line it sees
#[derive(Default)]
struct AlarmOnce {
    written: Vec<String>,
    replies: VecDeque<String>,
    alarmed: bool,
}

struct AlarmPort(Arc<Mutex<AlarmOnce>>);

impl SerialPort for AlarmPort {
    fn write_raw(&mut self, data: &[u8]) -> io::Result<()> {
        let mut c = self.0.lock().unwrap();
        let text = String::from_utf8_lossy(data).to_string();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            c.written.push(line.to_string());
            let reply = match line {
                "$?" => "<Idle|MPos:0.000,0.000,0.000|FS:0,0>",
                _ if line.starts_with("G1") && !c.alarmed => {
                    c.alarmed = true;
                    "ALARM:1"
                }
                _ => "ok",
            };
            c.replies.push_back(reply.to_string());
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.0.lock().unwrap().replies.pop_front())
    }

    fn input_pending(&mut self) -> io::Result<bool> {
        Ok(!self.0.lock().unwrap().replies.is_empty())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().replies.clear();
        Ok(())
    }

    fn name(&self) -> String {
        "alarm-once".to_string()
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
