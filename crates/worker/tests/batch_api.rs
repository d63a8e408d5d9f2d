//! Integration tests for the batch delivery endpoints.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, post_batch, post_raw, reading, test_config, AVG_DESTINATION,
    HIGH_DESTINATION, LOW_DESTINATION,
};
use sensorwatch_core::accumulator::AverageEvent;
use sensorwatch_core::classifier::{BoundKind, ClassifiedEvent};
use serde_json::json;

/// 2024-03-01T12:00:00Z, the test clock's start, in epoch milliseconds.
const CLOCK_START_MILLIS: i64 = 1_709_294_400_000;

// ---------------------------------------------------------------------------
// Abnormal values
// ---------------------------------------------------------------------------

#[tokio::test]
async fn low_and_high_readings_go_to_their_destinations() {
    let test = build_test_app(test_config(&[]));
    test.provider.serve("t1", 10.0, 20.0);

    let response = post_batch(
        &test.app,
        "/batches/abnormal",
        &[
            reading("t1", 5.0, 1000),
            reading("t1", 15.0, 1001),
            reading("t1", 25.0, 1002),
            reading("t1", 10.0, 1003),
            reading("t1", 20.0, 1004),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "processed": 5, "low": 1, "high": 1 })
    );

    assert_eq!(
        test.publisher.sent_to(LOW_DESTINATION),
        vec![json!({ "sensorId": "t1", "value": 5.0, "minValue": 10.0, "timestamp": 1000 })]
    );
    assert_eq!(
        test.publisher.sent_to(HIGH_DESTINATION),
        vec![json!({ "sensorId": "t1", "value": 25.0, "maxValue": 20.0, "timestamp": 1002 })]
    );
    assert_eq!(test.publisher.sent().len(), 2);
}

#[tokio::test]
async fn fractional_timestamps_are_echoed_exactly() {
    let test = build_test_app(test_config(&[]));
    test.provider.serve("t1", 10.0, 20.0);

    let response = post_batch(
        &test.app,
        "/batches/abnormal",
        &[json!({ "sensorId": "t1", "value": 5.0, "timestamp": 1_700_000_000.5 })],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        test.publisher.sent_to(LOW_DESTINATION),
        vec![json!({ "sensorId": "t1", "value": 5.0, "minValue": 10.0, "timestamp": 1_700_000_000.5 })]
    );
}

#[tokio::test]
async fn published_low_event_reads_back_as_classified_event() {
    let test = build_test_app(test_config(&[]));
    test.provider.serve("t1", 10.0, 20.0);

    post_batch(&test.app, "/batches/abnormal", &[reading("t1", 5.0, 1000)]).await;

    let payload = test.publisher.sent_to(LOW_DESTINATION).remove(0);
    let event: ClassifiedEvent = serde_json::from_value(payload).unwrap();
    assert_eq!(event.kind, BoundKind::Low);
    assert_eq!(event.bound, 10.0);
    assert_eq!(event.sensor_id, "t1");
}

#[tokio::test]
async fn bounds_are_fetched_once_while_fresh() {
    let test = build_test_app(test_config(&[]));
    test.provider.serve("t1", 0.0, 100.0);

    post_batch(&test.app, "/batches/abnormal", &[reading("t1", 50.0, 1)]).await;
    post_batch(&test.app, "/batches/abnormal", &[reading("t1", 51.0, 2)]).await;
    assert_eq!(test.provider.call_count(), 1);

    // Exactly at the threshold is still fresh.
    test.clock.advance(Duration::from_secs(60));
    post_batch(&test.app, "/batches/abnormal", &[reading("t1", 52.0, 3)]).await;
    assert_eq!(test.provider.call_count(), 1);

    test.clock.advance(Duration::from_secs(1));
    post_batch(&test.app, "/batches/abnormal", &[reading("t1", 53.0, 4)]).await;
    assert_eq!(test.provider.call_count(), 2);
}

#[tokio::test]
async fn refreshed_bounds_reclassify_the_same_value() {
    let test = build_test_app(test_config(&[]));
    test.provider.serve("t1", 0.0, 10.0);

    post_batch(&test.app, "/batches/abnormal", &[reading("t1", 12.0, 1)]).await;
    assert_eq!(test.publisher.sent_to(HIGH_DESTINATION).len(), 1);

    test.provider.serve("t1", 0.0, 20.0);
    test.clock.advance(Duration::from_secs(120));
    let response = post_batch(&test.app, "/batches/abnormal", &[reading("t1", 12.0, 2)]).await;

    assert_eq!(
        body_json(response).await,
        json!({ "processed": 1, "low": 0, "high": 0 })
    );
    assert_eq!(test.publisher.sent_to(HIGH_DESTINATION).len(), 1);
}

#[tokio::test]
async fn malformed_reading_aborts_the_rest_of_the_batch() {
    let test = build_test_app(test_config(&[]));
    test.provider.serve("t1", 10.0, 20.0);

    let response = post_batch(
        &test.app,
        "/batches/abnormal",
        &[
            reading("t1", 5.0, 1),
            json!({ "sensorId": "t1", "value": "hot", "timestamp": 2 }),
            reading("t1", 30.0, 3),
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "MALFORMED_INPUT");
    assert_eq!(json["pipeline"], "abnormal");
    assert_eq!(json["stage"], "parse");
    assert_eq!(json["record_index"], 1);

    // The first record was already published; the third never ran.
    assert_eq!(test.publisher.sent_to(LOW_DESTINATION).len(), 1);
    assert!(test.publisher.sent_to(HIGH_DESTINATION).is_empty());
}

#[tokio::test]
async fn malformed_envelope_is_rejected() {
    let test = build_test_app(test_config(&[]));

    let response = post_raw(&test.app, "/batches/abnormal", "not json").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["stage"], "envelope");

    let response = post_raw(&test.app, "/batches/abnormal", r#"{"Records":[{"Sns":{}}]}"#).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["record_index"], 0);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let test = build_test_app(test_config(&[]));

    let response = post_raw(&test.app, "/batches/abnormal", r#"{"Records":[]}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "processed": 0, "low": 0, "high": 0 })
    );
    assert_eq!(test.provider.call_count(), 0);
}

#[tokio::test]
async fn provider_failure_fails_the_batch_without_caching() {
    let test = build_test_app(test_config(&[]));
    test.provider.set_failing(true);

    let response = post_batch(&test.app, "/batches/abnormal", &[reading("t9", 1.0, 1)]).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PROVIDER_ERROR");
    assert_eq!(json["stage"], "classify");
    assert_eq!(json["sensor_id"], "t9");

    let cache = test.state.abnormal.as_ref().unwrap().cache();
    assert!(cache.peek("t9").await.is_none());
    assert!(test.publisher.sent().is_empty());
}

#[tokio::test]
async fn publish_failure_fails_the_abnormal_batch() {
    let test = build_test_app(test_config(&[]));
    test.provider.serve("t1", 10.0, 20.0);
    test.publisher.set_failing(true);

    let response = post_batch(&test.app, "/batches/abnormal", &[reading("t1", 5.0, 1)]).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PUBLISH_ERROR");
    assert_eq!(json["stage"], "publish");
}

// ---------------------------------------------------------------------------
// Averages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn average_is_emitted_when_the_window_fills() {
    let test = build_test_app(test_config(&[]));

    let response = post_batch(
        &test.app,
        "/batches/average",
        &[reading("t2", 1.0, 1), reading("t2", 2.0, 2)],
    )
    .await;
    assert_eq!(
        body_json(response).await,
        json!({ "processed": 2, "emitted": 0 })
    );
    assert!(test.publisher.sent().is_empty());

    let response = post_batch(&test.app, "/batches/average", &[reading("t2", 3.0, 3)]).await;
    assert_eq!(
        body_json(response).await,
        json!({ "processed": 1, "emitted": 1 })
    );
    assert_eq!(
        test.publisher.sent_to(AVG_DESTINATION),
        vec![json!({ "sensorId": "t2", "value": 2.0, "timestamp": CLOCK_START_MILLIS })]
    );

    let pipeline = test.state.average.as_ref().unwrap();
    assert_eq!(pipeline.accumulator().pending("t2"), 0);
}

#[tokio::test]
async fn averages_restart_after_each_window() {
    let test = build_test_app(test_config(&[]));

    let readings: Vec<_> = [1.0, 2.0, 3.0, 10.0, 20.0, 30.0, 7.0]
        .iter()
        .enumerate()
        .map(|(i, v)| reading("t3", *v, i as i64))
        .collect();
    let response = post_batch(&test.app, "/batches/average", &readings).await;

    assert_eq!(
        body_json(response).await,
        json!({ "processed": 7, "emitted": 2 })
    );
    let values: Vec<_> = test
        .publisher
        .sent_to(AVG_DESTINATION)
        .iter()
        .map(|p| p["value"].as_f64().unwrap())
        .collect();
    assert_eq!(values, vec![2.0, 20.0]);
    assert_eq!(
        test.state.average.as_ref().unwrap().accumulator().pending("t3"),
        1
    );
}

#[tokio::test]
async fn sensors_average_independently() {
    let test = build_test_app(test_config(&[("REDUCING_SIZE", "2")]));

    post_batch(
        &test.app,
        "/batches/average",
        &[
            reading("a", 1.0, 1),
            reading("b", 100.0, 2),
            reading("a", 3.0, 3),
        ],
    )
    .await;

    let sent = test.publisher.sent_to(AVG_DESTINATION);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["sensorId"], "a");
    assert_eq!(sent[0]["value"], 2.0);
    assert_eq!(
        test.state.average.as_ref().unwrap().accumulator().pending("b"),
        1
    );
}

#[tokio::test]
async fn publish_failure_still_clears_the_window() {
    let test = build_test_app(test_config(&[]));
    test.publisher.set_failing(true);

    let response = post_batch(
        &test.app,
        "/batches/average",
        &[reading("t2", 1.0, 1), reading("t2", 2.0, 2), reading("t2", 3.0, 3)],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["record_index"], 2);
    assert_eq!(
        test.state.average.as_ref().unwrap().accumulator().pending("t2"),
        0
    );
}

#[tokio::test]
async fn malformed_average_input_is_rejected() {
    let test = build_test_app(test_config(&[]));

    let response = post_batch(&test.app, "/batches/average", &[json!({ "value": 1.0 })]).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["pipeline"], "average");
}

// ---------------------------------------------------------------------------
// Average reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn published_averages_render_as_reports() {
    let test = build_test_app(test_config(&[("REPORT_TZ", "Asia/Jerusalem")]));

    post_batch(
        &test.app,
        "/batches/average",
        &[reading("t2", 1.0, 1), reading("t2", 2.0, 2), reading("t2", 3.0, 3)],
    )
    .await;
    let published = test.publisher.sent_to(AVG_DESTINATION);

    let response = post_batch(&test.app, "/batches/average-report", &published).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "processed": 1 }));

    let event: AverageEvent = serde_json::from_value(published[0].clone()).unwrap();
    let batch = sensorwatch_events::NotificationBatch::from_messages([
        serde_json::to_string(&event).unwrap()
    ]);
    let (_, reports) = test
        .state
        .report
        .as_ref()
        .unwrap()
        .process_batch(&batch)
        .unwrap();
    assert_eq!(
        reports[0].to_string(),
        "sensorId = t2\navg value = 2\ndate-time = Friday, 1 March 2024 at 14:00:00 IST"
    );
}

#[tokio::test]
async fn report_accepts_fractional_timestamps() {
    let test = build_test_app(test_config(&[]));

    let response = post_batch(
        &test.app,
        "/batches/average-report",
        &[json!({ "sensorId": "t2", "value": 2.0, "timestamp": 1_709_294_400_000.75 })],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "processed": 1 }));
}

#[tokio::test]
async fn malformed_report_input_is_rejected() {
    let test = build_test_app(test_config(&[]));

    let response = post_batch(
        &test.app,
        "/batches/average-report",
        &[json!({ "sensorId": "t2", "value": 2.0 })],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["pipeline"], "report");
}
