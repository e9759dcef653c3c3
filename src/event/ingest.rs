//! Line-oriented report ingestion.
//!
//! Each non-empty line is either a JSON `TimeoutReport` (`{"url": "..."}`) or
//! a bare URL, and is published on the configured topic.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;

use crate::event::{EventResult, EventSource, TimeoutReport};

/// Turn one input line into a report, if it holds one.
pub fn parse_line(line: &str) -> Option<TimeoutReport> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    if line.starts_with('{') {
        return match serde_json::from_str(line) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparsable report line");
                None
            }
        };
    }
    Some(TimeoutReport::new(line))
}

/// Publish every report read from `reader` until EOF or shutdown.
///
/// Returns the number of reports published.
pub async fn ingest_lines<R, S>(
    reader: R,
    source: &S,
    topic: &str,
    mut shutdown: broadcast::Receiver<()>,
) -> EventResult<usize>
where
    R: AsyncBufRead + Unpin,
    S: EventSource,
{
    let mut lines = reader.lines();
    let mut published = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if let Some(report) = parse_line(&line) {
                            source.publish(topic, &report)?;
                            published += 1;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read report input");
                        break;
                    }
                }
            }
            _ = shutdown.recv() => break,
        }
    }

    tracing::info!(published, "Report ingestion finished");
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventBus, RedeliveryPolicy, TIMEOUT_URL_TOPIC};

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line(r#"{"url": "http://a.onion/x"}"#),
            Some(TimeoutReport::new("http://a.onion/x"))
        );
        assert_eq!(
            parse_line("  http://b.onion  "),
            Some(TimeoutReport::new("http://b.onion"))
        );
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("# comment"), None);
        assert_eq!(parse_line(r#"{"link": 1}"#), None);
    }

    #[tokio::test]
    async fn test_ingest_counts_published() {
        let (shutdown, _) = broadcast::channel(1);
        let bus = EventBus::new(RedeliveryPolicy::default(), 1, shutdown.clone());
        let input: &[u8] = b"http://a.onion\n\n{\"url\":\"http://b.onion\"}\n# skip\n";

        let published = ingest_lines(input, &bus, TIMEOUT_URL_TOPIC, shutdown.subscribe())
            .await
            .unwrap();
        assert_eq!(published, 2);
    }
}
