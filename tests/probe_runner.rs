//! Probe runner tests using `sh` as a stand-in for fping.
#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pingflux::{
    ErrorClass, MalformedLinePolicy, MetricBuilder, MetricSink, Pipeline, PointBatch,
    ProbeRunner, SinkError,
};
use tokio::process::Command;

#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<PointBatch>>,
}

#[async_trait::async_trait]
impl MetricSink for RecordingSink {
    async fn write(&self, batch: &PointBatch) -> Result<(), SinkError> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }
}

fn fake_probe(script: &str) -> ProbeRunner {
    let mut command = Command::new("sh");
    command.arg("-c").arg(script);
    ProbeRunner::from_command(command)
}

fn pipeline(sink: Arc<RecordingSink>) -> Pipeline {
    Pipeline::new(MetricBuilder::new("ping", "probe-01"), "telegraf", sink)
}

#[tokio::test]
async fn test_runner_streams_stderr_into_pipeline() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(Arc::clone(&sink));

    let script = "\
echo '[12:00:30]' >&2
echo 'host1 : xmt/rcv/%loss = 10/9/10%, min/avg/max = 1.10/2.20/3.30' >&2
echo 'host2 : xmt/rcv/%loss = 5/0/100%' >&2
echo 'summary line on stdout'
exit 1";

    let stats = fake_probe(script).run(&mut pipeline).await.unwrap();

    assert_eq!(stats.lines, 3);
    assert_eq!(stats.written, 2);
    let batches = sink.batches.lock().unwrap();
    let hosts: Vec<_> = batches
        .iter()
        .map(|b| b.points()[0].tag("host").unwrap().to_string())
        .collect();
    assert_eq!(hosts, vec!["host1", "host2"]);
}

#[tokio::test]
async fn test_invalid_utf8_on_stdout_is_logged_not_fatal() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(Arc::clone(&sink));

    let script = "\
printf 'info \\377\\n'
sleep 0.2
echo 'host1 : xmt/rcv/%loss = 10/9/10%, min/avg/max = 1.10/2.20/3.30' >&2";

    let stats = fake_probe(script).run(&mut pipeline).await.unwrap();
    assert_eq!(stats.written, 1);
    assert_eq!(sink.batches.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_line_kills_probe() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(Arc::clone(&sink));

    let script = "\
echo 'host1 : xmt/rcv/%loss = 10/9' >&2
sleep 30";

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        fake_probe(script).run(&mut pipeline),
    )
    .await
    .expect("runner should stop without waiting for the probe");

    let err = result.unwrap_err();
    assert_eq!(err.class(), ErrorClass::MalformedInput);
    assert!(sink.batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_skip_policy_survives_malformed_lines() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline =
        pipeline(Arc::clone(&sink)).with_malformed_line_policy(MalformedLinePolicy::Skip);

    let script = "\
echo 'host1 : ICMP Host Unreachable from 10.0.0.1' >&2
echo 'host1 : xmt/rcv/%loss = 3/0/100%' >&2";

    let stats = fake_probe(script).run(&mut pipeline).await.unwrap();
    assert_eq!(stats.discarded, 1);
    assert_eq!(stats.written, 1);
}

#[tokio::test]
async fn test_missing_binary_is_config_error() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(sink);

    let runner = ProbeRunner::from_command(Command::new("/nonexistent/pingflux/fping"));
    let err = runner.run(&mut pipeline).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Config);
}
