use super::{Platform, PostImage, PublishError, Publisher};
use log::{error, info};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// 单个平台的发布结果
#[derive(Debug)]
pub struct PublishOutcome {
    pub platform: Platform,
    pub result: Result<(), PublishError>,
}

#[derive(Debug, Default)]
pub struct PublishReport {
    pub outcomes: Vec<PublishOutcome>,
}

impl PublishReport {
    pub fn succeeded(&self) -> Vec<Platform> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.platform)
            .collect()
    }

    pub fn failed(&self) -> Vec<(Platform, &PublishError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.platform, e)))
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Posts the same image to every publisher in order.
///
/// A failing platform is logged and recorded, never propagated: the
/// remaining platforms are still attempted. A panicking publisher is
/// caught and recorded as [`PublishError::Panicked`].
pub struct PublishFanOut {
    publishers: Vec<Box<dyn Publisher>>,
}

impl PublishFanOut {
    pub fn new(publishers: Vec<Box<dyn Publisher>>) -> Self {
        Self { publishers }
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.publishers.iter().map(|p| p.platform()).collect()
    }

    pub fn publish_all(&self, image: &PostImage, caption: &str) -> PublishReport {
        info!(
            "📤 Publishing {} ({} bytes) to {} platforms",
            image.file_name,
            image.bytes.len(),
            self.publishers.len()
        );

        let outcomes = self
            .publishers
            .iter()
            .map(|publisher| {
                let platform = publisher.platform();
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    publisher.publish(image, caption)
                }))
                .unwrap_or_else(|payload| Err(PublishError::Panicked(panic_message(&*payload))));
                match &result {
                    Ok(()) => info!("✅ {} post succeeded", platform),
                    Err(e) => error!("❌ {} post failed: {}", platform, e),
                }
                PublishOutcome { platform, result }
            })
            .collect();

        PublishReport { outcomes }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigError;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<(Platform, Vec<u8>, String)>>>;

    struct RecordingPublisher {
        platform: Platform,
        fail: bool,
        calls: Calls,
    }

    impl Publisher for RecordingPublisher {
        fn platform(&self) -> Platform {
            self.platform
        }

        fn publish(&self, image: &PostImage, alt_text: &str) -> Result<(), PublishError> {
            self.calls
                .lock()
                .unwrap()
                .push((self.platform, image.bytes.clone(), alt_text.to_string()));
            if self.fail {
                Err(PublishError::Api {
                    endpoint: "test".to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn fan_out(failing: &[Platform], calls: &Calls) -> PublishFanOut {
        PublishFanOut::new(
            Platform::ALL
                .iter()
                .map(|&platform| {
                    Box::new(RecordingPublisher {
                        platform,
                        fail: failing.contains(&platform),
                        calls: Arc::clone(calls),
                    }) as Box<dyn Publisher>
                })
                .collect(),
        )
    }

    fn image() -> PostImage {
        PostImage::from_bytes(Path::new("image.jpg"), vec![0xFF, 0xD8, 0xFF, 0xE0, 7])
    }

    #[test]
    fn test_one_failure_does_not_stop_the_rest() {
        let calls = Calls::default();
        let fanout = fan_out(&[Platform::Cohost], &calls);

        let report = fanout.publish_all(&image(), "clip01 (00:02:05)");

        let calls = calls.lock().unwrap();
        let order: Vec<_> = calls.iter().map(|(p, _, _)| *p).collect();
        assert_eq!(order, Platform::ALL);
        for (_, bytes, caption) in calls.iter() {
            assert_eq!(bytes, &image().bytes);
            assert_eq!(caption, "clip01 (00:02:05)");
        }

        assert_eq!(
            report.succeeded(),
            vec![
                Platform::Twitter,
                Platform::Tumblr,
                Platform::Mastodon,
                Platform::Bluesky
            ]
        );
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, Platform::Cohost);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_all_failing_still_attempts_every_platform() {
        let calls = Calls::default();
        let fanout = fan_out(&Platform::ALL, &calls);

        let report = fanout.publish_all(&image(), "clip01 (00:00:00)");

        assert_eq!(calls.lock().unwrap().len(), 5);
        assert!(report.succeeded().is_empty());
        assert_eq!(report.failed().len(), 5);
    }

    #[test]
    fn test_unconfigured_platform_is_reported_as_failure() {
        let calls = Calls::default();
        let fanout = PublishFanOut::new(vec![
            Box::new(super::super::UnconfiguredPublisher::new(
                Platform::Twitter,
                ConfigError::Missing {
                    var: "TWITTER_CONSUMER_KEY".to_string(),
                },
            )),
            Box::new(RecordingPublisher {
                platform: Platform::Bluesky,
                fail: false,
                calls: Arc::clone(&calls),
            }),
        ]);

        let report = fanout.publish_all(&image(), "clip01 (00:00:03)");

        assert_eq!(fanout.platforms(), vec![Platform::Twitter, Platform::Bluesky]);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(report.succeeded(), vec![Platform::Bluesky]);
        assert!(matches!(
            report.failed()[0].1,
            PublishError::Config(ConfigError::Missing { .. })
        ));
    }

    struct PanickingPublisher;

    impl Publisher for PanickingPublisher {
        fn platform(&self) -> Platform {
            Platform::Tumblr
        }

        fn publish(&self, _image: &PostImage, _alt_text: &str) -> Result<(), PublishError> {
            panic!("tumblr adapter blew up")
        }
    }

    #[test]
    fn test_panicking_publisher_does_not_skip_the_rest() {
        let calls = Calls::default();
        let recording = |platform| {
            Box::new(RecordingPublisher {
                platform,
                fail: false,
                calls: Arc::clone(&calls),
            }) as Box<dyn Publisher>
        };
        let fanout = PublishFanOut::new(vec![
            recording(Platform::Twitter),
            Box::new(PanickingPublisher),
            recording(Platform::Mastodon),
            recording(Platform::Bluesky),
        ]);

        let report = fanout.publish_all(&image(), "clip01 (00:02:05)");

        assert_eq!(calls.lock().unwrap().len(), 3);
        assert_eq!(
            report.succeeded(),
            vec![Platform::Twitter, Platform::Mastodon, Platform::Bluesky]
        );
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, Platform::Tumblr);
        assert!(matches!(
            failed[0].1,
            PublishError::Panicked(msg) if msg == "tumblr adapter blew up"
        ));
    }
}
