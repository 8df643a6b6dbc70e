mod common;

use common::{jpeg, logged_in, wait_for_requests, MB};
use mathwiz_client::error::{AppError, ValidationError};
use mathwiz_client::infrastructure::{HttpMethod, RequestBody};
use mathwiz_client::models::{ExplainKind, UploadFile};
use mathwiz_client::workflow::FlowPhase;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn solution_json() -> serde_json::Value {
    json!({
        "original_problem": "2x+5=11",
        "steps": [
            {"step_number": 1, "explanation": "Subtract 5"},
            {"step_number": 2, "explanation": "Divide by 2"}
        ],
        "final_answer": "x=3"
    })
}

#[tokio::test]
async fn oversized_image_is_rejected_without_any_request() {
    let h = logged_in();
    let flow = h.app.solve_flow();

    let err = assert_err!(flow.select_file(jpeg(12 * MB)).await);
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::FileTooLarge { .. })
    ));
    assert_eq!(h.transport.total_requests(), 0);
    assert_eq!(flow.phase(), FlowPhase::Idle);
}

#[tokio::test]
async fn wrong_file_type_is_rejected_distinctly() {
    let h = logged_in();
    let flow = h.app.solve_flow();

    let gif = UploadFile::new("anim.gif", "image/gif", vec![0; 1024]);
    let err = assert_err!(flow.select_file(gif).await);
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::UnsupportedFileType { .. })
    ));
    assert_eq!(h.transport.total_requests(), 0);
}

#[tokio::test]
async fn valid_image_triggers_exactly_one_extraction() {
    let h = logged_in();
    h.transport.push_json(
        HttpMethod::Post,
        "/upload-image",
        200,
        json!({"status": "success", "extracted_text": "2x + 5 = 11\r\n\r\n\r\n"}),
    );
    let flow = h.app.solve_flow();

    let text = assert_ok!(flow.select_file(jpeg(2 * MB)).await);
    assert_eq!(text, "2x + 5 = 11");
    assert_eq!(h.transport.request_count("/upload-image"), 1);
    assert_eq!(h.transport.request_count("/solve-text"), 0);

    let request = h.transport.last_request("/upload-image").unwrap();
    assert!(matches!(
        request.body,
        RequestBody::Multipart { ref field, ref mime, .. } if field == "file" && mime == "image/jpeg"
    ));

    let view = flow.view();
    assert_eq!(view.phase, FlowPhase::Extracted);
    assert_eq!(view.input, "2x + 5 = 11");
    assert_eq!(view.preview.map(|p| p.size), Some((2 * MB) as u64));
}

#[tokio::test]
async fn failed_extraction_surfaces_server_detail() {
    let h = logged_in();
    h.transport.push_json(
        HttpMethod::Post,
        "/upload-image",
        422,
        json!({"detail": "Could not read image"}),
    );
    let flow = h.app.solve_flow();

    assert_err!(flow.select_file(jpeg(1024)).await);
    let view = flow.view();
    assert_eq!(view.phase, FlowPhase::Failed);
    assert_eq!(view.error.as_deref(), Some("Could not read image"));
    assert!(view.preview.is_some());
}

#[tokio::test]
async fn solve_end_to_end() {
    let h = logged_in();
    h.transport
        .push_json(HttpMethod::Post, "/solve-text", 200, solution_json());
    let flow = h.app.solve_flow();
    flow.set_input("2x+5=11");

    let result = assert_ok!(flow.submit().await);
    assert_eq!(result.final_answer.as_deref(), Some("x=3"));
    assert_eq!(flow.phase(), FlowPhase::Completed);

    let request = h.transport.last_request("/solve-text").unwrap();
    assert_eq!(request.header_value("Authorization"), Some("Bearer abc123"));
    assert_eq!(
        request.body,
        RequestBody::Json(json!({"question_text": "2x+5=11"}))
    );
}

#[tokio::test]
async fn application_error_field_fails_the_flow() {
    let h = logged_in();
    h.transport.push_json(
        HttpMethod::Post,
        "/solve-text",
        200,
        json!({"error": "Could not parse the equation"}),
    );
    let flow = h.app.solve_flow();
    flow.set_input("2x+=");

    assert_err!(flow.submit().await);
    let view = flow.view();
    assert_eq!(view.phase, FlowPhase::Failed);
    assert_eq!(view.error.as_deref(), Some("Could not parse the equation"));
    assert!(view.result.is_none());
}

#[tokio::test]
async fn generic_message_when_server_gives_no_detail() {
    let h = logged_in();
    h.transport.push(
        HttpMethod::Post,
        "/solve-text",
        mathwiz_client::infrastructure::HttpResponse::new(502, "Bad Gateway"),
    );
    let flow = h.app.solve_flow();
    flow.set_input("1+1");

    assert_err!(flow.submit().await);
    assert_eq!(
        flow.view().error.as_deref(),
        Some("HTTP error — status 502")
    );
}

#[tokio::test]
async fn reset_after_completion_clears_everything_at_once() {
    let h = logged_in();
    h.transport.push_json(
        HttpMethod::Post,
        "/upload-image",
        200,
        json!({"status": "success", "extracted_text": "2x+5=11"}),
    );
    h.transport
        .push_json(HttpMethod::Post, "/solve-text", 200, solution_json());
    let flow = h.app.solve_flow();

    assert_ok!(flow.select_file(jpeg(2 * MB)).await);
    assert_ok!(flow.submit().await);
    let before = flow.view();
    assert!(before.result.is_some() && before.preview.is_some() && !before.input.is_empty());

    flow.reset();
    let view = flow.view();
    assert_eq!(view.phase, FlowPhase::Idle);
    assert_eq!(view.input, "");
    assert!(view.preview.is_none());
    assert!(view.result.is_none());
    assert!(view.error.is_none());
    assert!(flow.explanations().is_empty());
}

#[tokio::test]
async fn step_explanations_resolve_independently() {
    let h = logged_in();
    h.transport
        .push_json(HttpMethod::Post, "/solve-text", 200, solution_json());
    let release_step_one = h.transport.push_held(
        HttpMethod::Post,
        "/explain-step",
        200,
        json!({"explanation": "Move the constant to the other side"}),
    );
    h.transport.push_json(
        HttpMethod::Post,
        "/explain-step",
        200,
        json!({"explanation": "Dividing both sides keeps the equation balanced"}),
    );

    let flow = h.app.solve_flow();
    flow.set_input("2x+5=11");
    assert_ok!(flow.submit().await);

    let (step_one, step_two) = tokio::join!(flow.explain_step(1, ExplainKind::How), async {
        wait_for_requests(&h.transport, "/explain-step", 1).await;
        let step_two = flow.explain_step(2, ExplainKind::Why).await;

        // 第 2 步已返回，第 1 步仍在加载
        let pending = flow.explanation(1).unwrap();
        assert!(pending.loading);
        assert_eq!(pending.kind, ExplainKind::How);
        assert!(!flow.explanation(2).unwrap().loading);

        release_step_one.notify_one();
        step_two
    });

    assert_eq!(step_one.unwrap(), "Move the constant to the other side");
    assert_eq!(
        step_two.unwrap(),
        "Dividing both sides keeps the equation balanced"
    );
    let one = flow.explanation(1).unwrap();
    let two = flow.explanation(2).unwrap();
    assert!(!one.loading && !two.loading);
    assert_eq!(one.text.as_deref(), Some("Move the constant to the other side"));
    assert_eq!(two.kind, ExplainKind::Why);
    assert_eq!(flow.phase(), FlowPhase::Completed);
}

#[tokio::test]
async fn explain_request_carries_all_steps() {
    let h = logged_in();
    h.transport
        .push_json(HttpMethod::Post, "/solve-text", 200, solution_json());
    h.transport.push_json(
        HttpMethod::Post,
        "/explain-step",
        200,
        json!({"explanation": "ok", "updated_xp": 25}),
    );
    let flow = h.app.solve_flow();
    flow.set_input("2x+5=11");
    assert_ok!(flow.submit().await);

    assert_ok!(flow.explain_step(2, ExplainKind::Why).await);
    let request = h.transport.last_request("/explain-step").unwrap();
    let RequestBody::Json(body) = request.body else {
        panic!("expected JSON body");
    };
    assert_eq!(body["problem_text"], "2x+5=11");
    assert_eq!(body["step_number_to_explain"], 2);
    assert_eq!(body["query_type"], "why");
    assert_eq!(body["all_steps"].as_array().map(|s| s.len()), Some(2));
    assert_eq!(
        h.app.session().current_user().and_then(|u| u.current_xp),
        Some(25)
    );
}

#[tokio::test]
async fn unknown_step_is_rejected_locally() {
    let h = logged_in();
    h.transport
        .push_json(HttpMethod::Post, "/solve-text", 200, solution_json());
    let flow = h.app.solve_flow();
    flow.set_input("2x+5=11");
    assert_ok!(flow.submit().await);

    let err = assert_err!(flow.explain_step(7, ExplainKind::How).await);
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::UnknownStep { step_number: 7 })
    ));
    assert_eq!(h.transport.request_count("/explain-step"), 0);
}

#[tokio::test]
async fn duplicate_submit_is_busy_while_in_flight() {
    let h = logged_in();
    let release = h
        .transport
        .push_held(HttpMethod::Post, "/solve-text", 200, solution_json());
    let flow = h.app.solve_flow();
    flow.set_input("2x+5=11");

    let (first, second) = tokio::join!(flow.submit(), async {
        wait_for_requests(&h.transport, "/solve-text", 1).await;
        let second = flow.submit().await;
        release.notify_one();
        second
    });

    assert_ok!(first);
    assert!(matches!(second, Err(AppError::Busy { .. })));
    assert_eq!(h.transport.request_count("/solve-text"), 1);
}

#[tokio::test]
async fn reset_cancels_the_outstanding_solve_before_the_next_one() {
    let h = logged_in();
    let _first_release = h.transport.push_held(
        HttpMethod::Post,
        "/solve-text",
        200,
        json!({"steps": [{"step_number": 1, "explanation": "stale"}], "final_answer": "stale"}),
    );
    let second_release = h
        .transport
        .push_held(HttpMethod::Post, "/solve-text", 200, solution_json());
    let flow = h.app.solve_flow();
    flow.set_input("x^2 = 9");

    let (first, second) = tokio::join!(flow.submit(), async {
        wait_for_requests(&h.transport, "/solve-text", 1).await;
        flow.reset();
        assert!(!flow.view().processing);
        flow.set_input("2x+5=11");
        let (second, _) = tokio::join!(flow.submit(), async {
            wait_for_requests(&h.transport, "/solve-text", 2).await;
            second_release.notify_one();
        });
        second
    });

    assert!(first.unwrap_err().is_cancelled());
    let second = assert_ok!(second);
    assert_eq!(second.final_answer.as_deref(), Some("x=3"));
    assert_eq!(h.transport.request_count("/solve-text"), 2);
    assert_eq!(h.transport.max_in_flight(), 1);
    assert_eq!(h.transport.in_flight(), 0);

    let view = flow.view();
    assert_eq!(view.phase, FlowPhase::Completed);
    assert_eq!(view.input, "2x+5=11");
    assert_eq!(
        view.result.and_then(|r| r.final_answer),
        Some("x=3".to_string())
    );
}

#[tokio::test]
async fn closing_the_flow_discards_the_late_result() {
    let h = logged_in();
    let _release = h
        .transport
        .push_held(HttpMethod::Post, "/solve-text", 200, solution_json());
    let flow = h.app.solve_flow();
    flow.set_input("2x+5=11");

    let (outcome, _) = tokio::join!(flow.submit(), async {
        wait_for_requests(&h.transport, "/solve-text", 1).await;
        flow.close();
    });

    assert!(outcome.unwrap_err().is_cancelled());
    assert!(flow.view().result.is_none());
    assert!(flow.is_closed());
}

#[tokio::test]
async fn flows_are_independent() {
    let h = logged_in();
    h.transport
        .push_json(HttpMethod::Post, "/solve-text", 200, solution_json());
    let first = h.app.solve_flow();
    let second = h.app.solve_flow();
    assert_ne!(first.ctx().flow_id, second.ctx().flow_id);

    first.set_input("2x+5=11");
    assert_ok!(first.submit().await);
    assert!(second.view().result.is_none());
    assert_eq!(second.phase(), FlowPhase::Idle);
}
