//! Collection and delivery of telemetry batches.

use std::sync::Arc;
use std::time::Duration;

use cart_telemetry::cart::CART_ITEMS_GAUGE;
use cart_telemetry::config::ExporterConfig;
use cart_telemetry::export::{HttpSink, SinkError, TelemetrySink};
use cart_telemetry::http::middleware::LATENCY_HISTOGRAM;
use cart_telemetry::instruments::{AttributeValue, MetricData};
use cart_telemetry::lifecycle::{Services, Shutdown};
use cart_telemetry::ServiceConfig;

mod common;

#[tokio::test]
async fn test_batch_carries_spans_metrics_and_resource() {
    let app = common::spawn_app(vec![]);
    common::get(&app.router, "/cart/add?user_id=u1&item=apple").await;
    common::get(&app.router, "/cart/add?user_id=u1&item=pear").await;
    common::get(&app.router, "/cart/add?user_id=u2&item=fig").await;

    let mut scheduler = app.scheduler();
    scheduler.export_once().await.unwrap();

    let batches = app.sink.take();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];

    assert_eq!(batch.spans.len(), 3);
    assert_eq!(
        batch.resource.attributes.get("service.name"),
        Some(&AttributeValue::from("cart-telemetry"))
    );
    assert_eq!(
        batch.resource.attributes.get("library.language"),
        Some(&AttributeValue::from("rust"))
    );

    let mut sizes: Vec<(String, i64)> = batch
        .metric(CART_ITEMS_GAUGE)
        .unwrap()
        .gauge_points()
        .iter()
        .map(|p| (p.attributes.get("user_id").unwrap().to_string(), p.value))
        .collect();
    sizes.sort();
    assert_eq!(sizes, vec![("u1".to_string(), 2), ("u2".to_string(), 1)]);

    let latency = batch.metric(LATENCY_HISTOGRAM).unwrap();
    let recorded: u64 = latency.histogram_points().iter().map(|p| p.count).sum();
    assert_eq!(recorded, 3);
}

#[tokio::test]
async fn test_empty_store_exports_gauge_without_points() {
    let app = common::spawn_app(vec![]);
    let mut scheduler = app.scheduler();
    scheduler.export_once().await.unwrap();

    let batch = &app.sink.batches()[0];
    let gauge = batch.metric(CART_ITEMS_GAUGE).unwrap();
    assert!(matches!(&gauge.data, MetricData::Gauge(points) if points.is_empty()));
    assert!(batch.spans.is_empty());
}

#[tokio::test]
async fn test_failed_export_keeps_data_for_next_cycle() {
    let app = common::spawn_app(vec![]);
    let mut scheduler = app.scheduler();

    common::get(&app.router, "/health").await;
    app.sink.set_failing(true);
    assert!(scheduler.export_once().await.is_err());
    assert_eq!(scheduler.pending_batches(), 1);

    // Requests keep working while the sink is down.
    let (status, _) = common::get(&app.router, "/health").await;
    assert!(status.is_success());

    app.sink.set_failing(false);
    scheduler.export_once().await.unwrap();
    let batches = app.sink.take();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].spans.len(), 1);
    assert_eq!(batches[1].spans.len(), 1);
}

#[tokio::test]
async fn test_http_sink_posts_json_batches() {
    let (addr, collector) = common::start_mock_collector().await;
    let config = ExporterConfig {
        endpoint: addr.to_string(),
        insecure: true,
        ..ExporterConfig::default()
    };
    let sink = Arc::new(HttpSink::new(&config).unwrap());
    assert_eq!(sink.url(), format!("http://{}/v1/telemetry", addr));

    let app = common::spawn_app(vec![]);
    common::get(&app.router, "/cart/add?user_id=u1&item=apple").await;
    let batch = app.scheduler().collect();

    sink.export(&batch).await.unwrap();
    let received = collector.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["resource"]["attributes"]["service.name"], "cart-telemetry");
    assert_eq!(received[0]["spans"][0]["name"], "GET /cart/add");

    collector.set_status(503);
    let err = sink.export(&batch).await.unwrap_err();
    assert!(matches!(err, SinkError::Rejected { status: 503 }));
}

#[tokio::test]
async fn test_http_sink_unreachable_collector() {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = ExporterConfig {
        endpoint: addr.to_string(),
        ..ExporterConfig::default()
    };
    let sink = HttpSink::new(&config).unwrap();
    let app = common::spawn_app(vec![]);
    let err = sink.export(&app.scheduler().collect()).await.unwrap_err();
    assert!(matches!(err, SinkError::Unavailable(_)));
}

#[tokio::test]
async fn test_shutdown_flushes_last_requests() {
    let config = ServiceConfig {
        exporter: ExporterConfig {
            interval_secs: 3600,
            ..ExporterConfig::default()
        },
        ..ServiceConfig::default()
    };
    let sink = Arc::new(cart_telemetry::export::MemorySink::new());
    let services = Services::with_sink(&config, sink.clone()).unwrap();
    let router = cart_telemetry::HttpServer::new(&config, &services).router();

    let shutdown = Shutdown::new();
    let handle = services
        .export_scheduler(&config.exporter)
        .spawn(shutdown.subscribe());

    common::get(&router, "/cart/add?user_id=u1&item=apple").await;
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].spans.len(), 1);
    assert_eq!(
        batches[0].metric(CART_ITEMS_GAUGE).unwrap().gauge_points()[0].value,
        1
    );
}
