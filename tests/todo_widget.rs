mod common;

use common::{add, find, harness, root_of, text_of, Harness};
use serde_json::{json, Value};
use widget_dashboard::dashboard::widgets::TodoWidget;
use widget_dashboard::dashboard::CardOutcome;
use widget_dashboard::dom::EventKind;
use widget_dashboard::storage::KeyValueStore;

fn type_task(h: &mut Harness, id: &str, text: &str) -> CardOutcome {
    let root = root_of(h, id);
    let input = find(h.dashboard.document(), root, "todo-widget__input-field");
    h.dashboard.dispatch(input, EventKind::Submit, Some(text))
}

fn todo<'a>(h: &'a Harness, id: &str) -> &'a TodoWidget {
    h.dashboard.widget_as::<TodoWidget>(id).unwrap()
}

#[test]
fn empty_list_shows_placeholder_and_zero_stats() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({}));
    let text = text_of(&h, &id);
    assert!(text.contains("No tasks yet. Add the first one!"));
    assert!(text.contains("Total: 0"));
    let root = root_of(&h, &id);
    assert!(h
        .dashboard
        .document()
        .find_by_class(root, "todo-widget__clear-btn")
        .is_none());
}

#[test]
fn submitting_the_input_adds_a_task() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({}));
    assert_eq!(type_task(&mut h, &id, "  Buy milk  "), CardOutcome::Handled);
    assert_eq!(todo(&h, &id).tasks()[0].text, "Buy milk");

    // the content is rebuilt, so the input is empty again
    let root = root_of(&h, &id);
    let input = find(h.dashboard.document(), root, "todo-widget__input-field");
    assert_eq!(h.dashboard.document().value(input), "");
    assert!(text_of(&h, &id).contains("Left: 1"));

    assert_eq!(type_task(&mut h, &id, "   "), CardOutcome::Ignored);
    assert_eq!(todo(&h, &id).tasks().len(), 1);
}

#[test]
fn add_button_reads_the_input_value() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({}));
    let root = root_of(&h, &id);
    let (input, button) = {
        let doc = h.dashboard.document();
        (
            find(doc, root, "todo-widget__input-field"),
            find(doc, root, "todo-widget__add-btn"),
        )
    };
    h.dashboard.document_mut().set_value(input, "Call mom");
    assert_eq!(
        h.dashboard.dispatch(button, EventKind::Click, None),
        CardOutcome::Handled
    );
    assert_eq!(todo(&h, &id).tasks()[0].text, "Call mom");
}

#[test]
fn long_text_is_cut_to_max_length() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({"max_length": 5}));
    type_task(&mut h, &id, "abcdefgh");
    assert_eq!(todo(&h, &id).tasks()[0].text, "abcde");
}

#[test]
fn checkbox_toggles_and_clear_removes_completed() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({}));
    type_task(&mut h, &id, "one");
    type_task(&mut h, &id, "two");

    let root = root_of(&h, &id);
    let first = h
        .dashboard
        .document()
        .find_all_by_class(root, "todo-widget__checkbox")[0];
    assert_eq!(
        h.dashboard.dispatch(first, EventKind::Change, None),
        CardOutcome::Handled
    );
    let t = todo(&h, &id);
    assert!(t.tasks()[0].completed);
    assert!(t.tasks()[0].completed_at.is_some());
    assert_eq!((t.completed_count(), t.pending_count()), (1, 1));

    let doc = h.dashboard.document();
    let task = doc.find_by_class(root, "todo-widget__task--completed").unwrap();
    assert!(doc.text_content(task).contains("one"));

    let clear = find(doc, root, "todo-widget__clear-btn");
    h.dashboard.dispatch(clear, EventKind::Click, None);
    let texts: Vec<&str> = todo(&h, &id).tasks().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["two"]);
}

#[test]
fn delete_button_removes_one_task() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({}));
    type_task(&mut h, &id, "keep");
    type_task(&mut h, &id, "drop");
    let root = root_of(&h, &id);
    let delete = h
        .dashboard
        .document()
        .find_all_by_class(root, "todo-widget__delete-btn")[1];
    h.dashboard.dispatch(delete, EventKind::Click, None);
    let texts: Vec<&str> = todo(&h, &id).tasks().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["keep"]);
}

#[test]
fn tasks_are_recorded_under_the_widget_key() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({}));
    type_task(&mut h, &id, "Write report");
    let raw = h.store.get(&format!("todo-widget-{id}")).unwrap().unwrap();
    let record: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(record["tasks"][0]["text"], json!("Write report"));
    assert_eq!(record["tasks"][0]["completed"], json!(false));
    assert!(record["tasks"][0]["createdAt"].is_string());
}

#[test]
fn stored_record_wins_over_configured_tasks() {
    let mut h = harness();
    h.store
        .set(
            "todo-widget-fixed",
            &json!({"tasks": [{"id": 7, "text": "from storage"}], "nextId": 8}).to_string(),
        )
        .unwrap();
    h.dashboard
        .add_widget(
            "todo",
            json!({"id": "fixed", "tasks": [{"id": 1, "text": "from config"}]}),
        )
        .unwrap();
    let t = todo(&h, "fixed");
    assert_eq!(t.tasks().len(), 1);
    assert_eq!(t.tasks()[0].text, "from storage");
}

#[test]
fn clear_all_wipes_every_todo_record() {
    let mut h = harness();
    let a = add(&mut h, "todo", json!({}));
    let b = add(&mut h, "todo", json!({}));
    type_task(&mut h, &a, "x");
    type_task(&mut h, &b, "y");
    h.dashboard.clear_all();
    assert!(!h.store.keys().iter().any(|k| k.starts_with("todo-widget-")));
}
