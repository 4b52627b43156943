use super::*;
use dealmon::utils::time::minutes;
use dealmon::{DealMon, DispatchOutcome};

#[tokio::test(start_paused = true)]
async fn test_deal_then_price_rise_sends_one_alert() -> anyhow::Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let mut monitor = DealMon::with_checkers(
        &email_settings(0.0),
        vec![ScriptedChecker::boxed("ssd", &[Some(45), Some(55)])],
        transport.clone(),
    );

    monitor.start().await?;
    // Checks at t=0 (45, deal) and t=30 (55, no deal)
    tokio::time::sleep(minutes(45.0)).await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 2, "one email per recipient");
    assert_eq!(sent[0].to, "me@example.com");
    assert_eq!(sent[1].to, "you@example.com");
    assert_eq!(sent[0].subject, "[DealMon] ssd product");
    assert!(sent[0].body.contains("Price: $45"));
    assert!(sent[0].body.contains("Stores: Store A"));

    let job = monitor.scheduler().get_job_info("ssd").await.unwrap();
    assert_eq!(job.run_count, 2);
    assert_eq!(job.deals_found, 1);

    monitor.stop().await;
    assert!(transport.is_closed());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_suppresses_repeat_alerts() -> anyhow::Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let mut monitor = DealMon::with_checkers(
        &email_settings(24.0 * 60.0),
        vec![ScriptedChecker::boxed("ssd", &[Some(45)])],
        transport.clone(),
    );

    monitor.start().await?;
    tokio::time::sleep(minutes(95.0)).await;
    monitor.stop().await;

    let job = monitor.scheduler().get_job_info("ssd").await.unwrap();
    assert_eq!(job.deals_found, 4);
    assert_eq!(transport.sent().len(), 2, "only the first deal is emailed");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failing_product_does_not_affect_others() -> anyhow::Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let mut monitor = DealMon::with_checkers(
        &email_settings(0.0),
        vec![
            ScriptedChecker::boxed("broken", &[None]),
            ScriptedChecker::boxed("ssd", &[Some(55), Some(45)]),
        ],
        transport.clone(),
    );

    monitor.start().await?;
    tokio::time::sleep(minutes(45.0)).await;

    let broken = monitor.scheduler().get_job_info("broken").await.unwrap();
    assert!(broken.error_count >= 1);
    assert!(monitor.scheduler().is_running("broken"));

    let ssd = monitor.scheduler().get_job_info("ssd").await.unwrap();
    assert_eq!(ssd.run_count, 2);
    assert_eq!(ssd.deals_found, 1);
    assert_eq!(transport.sent().len(), 2);

    let stats = monitor.scheduler().get_stats().await;
    assert_eq!(stats.total_jobs, 2);
    assert_eq!(stats.failing_jobs, 1);

    monitor.stop().await;
    assert!(!monitor.scheduler().is_running("ssd"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_until_stops_on_shutdown_signal() -> anyhow::Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let mut monitor = DealMon::with_checkers(
        &email_settings(0.0),
        vec![ScriptedChecker::boxed("ssd", &[Some(55)])],
        transport.clone(),
    );

    monitor
        .run_until(tokio::time::sleep(minutes(10.0)))
        .await?;

    assert!(!monitor.is_running());
    assert!(transport.is_closed());
    assert!(transport.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_run_once_reports_every_product() -> anyhow::Result<()> {
    let transport = Arc::new(RecordingTransport::default());
    let mut monitor = DealMon::with_checkers(
        &email_settings(0.0),
        vec![
            ScriptedChecker::boxed("cheap", &[Some(45)]),
            ScriptedChecker::boxed("pricey", &[Some(55)]),
            ScriptedChecker::boxed("broken", &[None]),
        ],
        transport.clone(),
    );

    let outcomes = monitor.run_once().await?;
    assert_eq!(outcomes.len(), 3);

    let cheap = outcomes[0].result.as_ref().unwrap();
    assert!(cheap.deal);
    assert_eq!(cheap.stores, vec!["Store A"]);
    assert_eq!(outcomes[0].dispatch, Some(DispatchOutcome::Sent { delivered: 2, failed: 0 }));

    let pricey = outcomes[1].result.as_ref().unwrap();
    assert!(!pricey.deal);
    assert!(pricey.stores.is_empty());

    assert!(outcomes[2].result.is_err());
    assert_eq!(outcomes[2].dispatch, None);

    assert_eq!(transport.sent().len(), 2);
    Ok(())
}
