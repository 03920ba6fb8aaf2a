use super::*;
use crate::i18n::I18nManager;
use crate::renderer::RendererRegistry;
use futures::channel::oneshot;
use futures::executor::block_on;
use gpui::{IntoElement, SharedString, TestAppContext, div};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn controller(schema: Schema, initial: FormValues, options: FormOptions) -> FormController {
    FormController::new(schema, initial, options).with_i18n(I18nManager::new().with_locale("en-US"))
}

fn email_field() -> ValueField {
    ValueField::input("email").label("Email").required(true)
}

fn message(errors: &FormErrors, name: &'static str) -> Option<String> {
    errors.get_named(name).map(|message| message.to_string())
}

fn recording_handler(controller: &FormController) -> Arc<Mutex<Vec<FormValues>>> {
    let submitted = Arc::new(Mutex::new(Vec::new()));
    let sink = submitted.clone();
    controller
        .register_submit_handler(move |values, _reporter| {
            sink.lock().expect("submit sink").push(values);
        })
        .expect("register submit handler");
    submitted
}

#[test]
fn submit_with_missing_required_value_blocks_handler() {
    let controller = controller(vec![email_field().into()], FormValues::new(), FormOptions::default());
    let submitted = recording_handler(&controller);

    assert!(!controller.on_check_submit(None).expect("submit"));

    let errors = controller.errors().expect("errors");
    assert_eq!(message(&errors, "email"), Some("Email is required".to_string()));
    assert_eq!(errors.messages().count(), 1);
    assert!(submitted.lock().expect("submitted").is_empty());
    assert_eq!(controller.status().expect("status"), FormStatus::Invalid);
}

#[test]
fn submit_after_update_passes_values_to_handler() {
    let email = email_field();
    let controller = controller(vec![email.clone().into()], FormValues::new(), FormOptions::default());
    let submitted = recording_handler(&controller);

    controller.update_item("a@b.com", &email).expect("update");
    assert!(controller.on_check_submit(None).expect("submit"));

    assert!(!controller.errors().expect("errors").has_errors());
    let submitted = submitted.lock().expect("submitted");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].get_named("email"), &FieldValue::text("a@b.com"));
    assert!(!controller.is_modified().expect("modified"));
}

#[test]
fn repeated_submit_calls_handler_every_time() {
    let email = email_field();
    let controller = controller(
        vec![email.into()],
        FormValues::from_iter([("email", "a@b.com")]),
        FormOptions::default(),
    );
    let submitted = recording_handler(&controller);

    assert!(controller.on_check_submit(None).expect("first submit"));
    let first = controller.errors().expect("errors");
    assert!(controller.on_check_submit(None).expect("second submit"));

    assert_eq!(controller.errors().expect("errors"), first);
    assert_eq!(submitted.lock().expect("submitted").len(), 2);
    assert_eq!(controller.snapshot().expect("snapshot").submit_count, 2);
}

#[test]
fn submit_without_handler_still_stores_errors() {
    let controller = controller(vec![email_field().into()], FormValues::new(), FormOptions::default());
    assert!(!controller.on_check_submit(None).expect("submit"));
    assert!(controller.errors().expect("errors").has_errors());

    controller.clear_submit_handler().expect("clear handler");
    let snapshot = FormValues::from_iter([("email", "x@y.z")]);
    assert!(controller.on_check_submit(Some(snapshot)).expect("submit"));
    assert!(!controller.errors().expect("errors").has_errors());
}

#[test]
fn required_gate_treats_only_empty_and_empty_text_as_missing() {
    let field = ValueField::input("name").label("Full name").required(true);
    let controller = controller(vec![field.clone().into()], FormValues::new(), FormOptions::default());
    let form = FormValues::new();

    for missing in [FieldValue::Empty, FieldValue::text("")] {
        let error = validate_field(&missing, &field, &form, controller.i18n()).expect("required error");
        assert!(error.contains("Full name"));
    }
    for present in [
        FieldValue::text(" "),
        FieldValue::Bool(false),
        FieldValue::from(0_i64),
        FieldValue::List(Vec::new()),
    ] {
        assert_eq!(validate_field(&present, &field, &form, controller.i18n()), None);
    }
}

#[test]
fn required_message_follows_locale() {
    let field = ValueField::input("email").label("邮箱").required(true);
    let controller = FormController::new(vec![field.into()], FormValues::new(), FormOptions::default())
        .with_i18n(I18nManager::new().with_locale("zh-CN"));

    controller.on_check_submit(None).expect("submit");
    assert_eq!(
        message(&controller.errors().expect("errors"), "email"),
        Some("邮箱不能为空".to_string())
    );
}

#[test]
fn validator_runs_before_rules_and_required_gate() {
    let field = ValueField::input("user")
        .required(true)
        .rule(ValidateRule::min_length(3))
        .validator(|value, _field, _form| {
            (value.as_text() == Some("root")).then(|| SharedString::from("reserved"))
        });
    let form = FormValues::new();
    let i18n = I18nManager::new().with_locale("en-US");

    assert_eq!(
        validate_field(&FieldValue::text("root"), &field, &form, &i18n).map(|m| m.to_string()),
        Some("reserved".to_string())
    );
    assert_eq!(
        validate_field(&FieldValue::text("ab"), &field, &form, &i18n).map(|m| m.to_string()),
        Some("user must be at least 3 characters".to_string())
    );
    assert_eq!(
        validate_field(&FieldValue::Empty, &field, &form, &i18n).map(|m| m.to_string()),
        Some("user is required".to_string())
    );
}

#[test]
fn hidden_fields_are_excluded_from_submit() {
    let flagged = |form: &FormValues| form.get_named("flag") == &FieldValue::Bool(true);
    let detail = ValueField::input("detail").required(true).should_hide(flagged);
    let flag = ValueField::switch("flag");
    let controller = controller(
        vec![flag.clone().into(), detail.into()],
        FormValues::new(),
        FormOptions::default(),
    );

    controller.update_item(true, &flag).expect("update flag");
    assert!(controller.on_check_submit(None).expect("submit"));
    assert!(!controller.errors().expect("errors").contains_key(&FieldKey::new("detail")));
}

#[test]
fn hidden_container_hides_its_subtree() {
    let controller = controller(
        vec![
            FieldDescriptor::group(vec![ValueField::input("inner").required(true).into()])
                .only_show(|form| form.get_named("mode") == &FieldValue::text("advanced"))
                .into(),
        ],
        FormValues::new(),
        FormOptions::default(),
    );
    assert!(controller.on_check_submit(None).expect("simple mode submit"));

    let advanced = FormValues::from_iter([("mode", "advanced")]);
    assert!(!controller.on_check_submit(Some(advanced)).expect("advanced mode submit"));
    assert!(controller.error(&FieldKey::new("inner")).expect("error").is_some());
}

#[test]
fn duplicate_names_resolve_to_the_last_field() {
    let controller = controller(
        vec![
            ValueField::input("code").required(true).into(),
            ValueField::input("code").into(),
        ],
        FormValues::new(),
        FormOptions::default(),
    );
    assert!(controller.on_check_submit(None).expect("submit"));
}

#[test]
fn custom_multiple_check_replaces_group_entries() {
    let group = CustomMultipleField::new(["a", "b"]).validate_multiple(|form, _field| {
        let mut patch = ErrorPatch::new();
        patch.insert("a".into(), None);
        if form.get_named("b").is_blank() {
            patch.insert("b".into(), Some("b required".into()));
        }
        patch
    });
    let controller = controller(vec![group.clone().into()], FormValues::new(), FormOptions::default());
    let pending = controller
        .check_item_custom_multiple(FormValues::from_iter([("a", "x")]), &group)
        .expect("check group");
    assert!(pending.is_none());

    let errors = controller.errors().expect("errors");
    assert!(errors.contains_key(&FieldKey::new("a")));
    assert_eq!(message(&errors, "a"), None);
    assert_eq!(message(&errors, "b"), Some("b required".to_string()));
    assert_eq!(controller.value(&FieldKey::new("a")).expect("value"), FieldValue::Empty);
}

#[test]
fn custom_multiple_check_clears_names_missing_from_result() {
    let first_pass = Arc::new(AtomicBool::new(true));
    let toggle = first_pass.clone();
    let group = CustomMultipleField::new(["start", "end"]).validate_multiple(move |_form, _field| {
        let mut patch = ErrorPatch::new();
        if toggle.swap(false, Ordering::SeqCst) {
            patch.insert("end".into(), Some("end before start".into()));
        } else {
            patch.insert("start".into(), Some("start in the past".into()));
        }
        patch
    });
    let controller = controller(vec![group.clone().into()], FormValues::new(), FormOptions::default());

    let _ = controller
        .check_item_custom_multiple(FormValues::new(), &group)
        .expect("first check");
    assert_eq!(
        message(&controller.errors().expect("errors"), "end"),
        Some("end before start".to_string())
    );

    let _ = controller
        .check_item_custom_multiple(FormValues::new(), &group)
        .expect("second check");
    let errors = controller.errors().expect("errors");
    assert_eq!(message(&errors, "end"), None);
    assert_eq!(message(&errors, "start"), Some("start in the past".to_string()));
}

#[test]
fn custom_multiple_groups_run_on_submit() {
    let group = CustomMultipleField::new(["password", "confirm"]).validate_multiple(|form, _field| {
        let mut patch = ErrorPatch::new();
        if form.get_named("password") != form.get_named("confirm") {
            patch.insert("confirm".into(), Some("passwords differ".into()));
        }
        patch
    });
    let controller = controller(
        vec![FieldDescriptor::nested(vec![group.into()]).into()],
        FormValues::from_iter([("password", "a"), ("confirm", "b")]),
        FormOptions::default(),
    );
    assert!(!controller.on_check_submit(None).expect("submit"));
    assert_eq!(
        message(&controller.errors().expect("errors"), "confirm"),
        Some("passwords differ".to_string())
    );
}

#[test]
fn reset_keeps_keys_and_clears_everything_else() {
    let email = email_field();
    let controller = controller(
        vec![email.clone().into()],
        FormValues::from_iter([("email", "a@b.com"), ("extra", "x")]),
        FormOptions::default(),
    );
    controller.update_item("", &email).expect("update");
    controller.on_check_submit(None).expect("submit");
    assert_eq!(controller.status().expect("status"), FormStatus::Invalid);

    controller.reset_form().expect("reset");

    let values = controller.values().expect("values");
    assert_eq!(values.len(), 2);
    assert!(values.iter().all(|(_, value)| value == &FieldValue::Empty));
    assert!(controller.errors().expect("errors").is_empty());
    assert!(!controller.is_modified().expect("modified"));
    assert_eq!(controller.status().expect("status"), FormStatus::Clean);
}

#[test]
fn status_follows_edit_submit_cycle() {
    let email = email_field();
    let controller = controller(vec![email.clone().into()], FormValues::new(), FormOptions::default());
    assert_eq!(controller.status().expect("status"), FormStatus::Clean);

    controller.update_item("", &email).expect("update");
    assert_eq!(controller.status().expect("status"), FormStatus::Editing);

    controller.on_check_submit(None).expect("failed submit");
    assert_eq!(controller.status().expect("status"), FormStatus::Invalid);

    controller.update_item("a@b.com", &email).expect("fix value");
    assert_eq!(controller.status().expect("status"), FormStatus::Invalid);

    controller.on_check_submit(None).expect("passing submit");
    assert_eq!(controller.status().expect("status"), FormStatus::Clean);
}

#[test]
fn on_change_derives_values_in_the_same_transition() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let city = ValueField::input("city").on_change(|_value, _draft, _internals| {
        panic!("derived writes must not trigger on_change");
    });
    let country = ValueField::select("country", vec![SelectOption::new("fr", "France")]).on_change(
        move |value, draft, internals| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert_eq!(internals.previous.get_named("country"), &FieldValue::text("de"));
            assert_eq!(draft.get_named("country"), value);
            draft.set("city", FieldValue::Empty);
        },
    );
    let controller = controller(
        vec![country.clone().into(), city.into()],
        FormValues::from_iter([("country", "de"), ("city", "Berlin")]),
        FormOptions::default(),
    );
    let before = controller.values().expect("values before");

    controller.update_item("fr", &country).expect("update");

    let after = controller.values().expect("values after");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(after.get_named("country"), &FieldValue::text("fr"));
    assert_eq!(after.get_named("city"), &FieldValue::Empty);
    assert_eq!(before.get_named("city"), &FieldValue::text("Berlin"));
    assert!(controller.is_modified().expect("modified"));
}

#[test]
fn derived_writes_do_not_trigger_the_target_on_change() {
    let source_calls = Arc::new(AtomicUsize::new(0));
    let target_calls = Arc::new(AtomicUsize::new(0));
    let source_counter = source_calls.clone();
    let target_counter = target_calls.clone();
    let target = ValueField::input("slug").on_change(move |_value, _draft, _internals| {
        target_counter.fetch_add(1, Ordering::SeqCst);
    });
    let source = ValueField::input("title").on_change(move |value, draft, _internals| {
        source_counter.fetch_add(1, Ordering::SeqCst);
        let slug = value.as_text().map(|text| text.to_lowercase()).unwrap_or_default();
        draft.set("slug", slug);
    });
    let controller = controller(
        vec![source.clone().into(), target.into()],
        FormValues::new(),
        FormOptions::default(),
    );

    controller.update_item("Hello", &source).expect("update");

    assert_eq!(source_calls.load(Ordering::SeqCst), 1);
    assert_eq!(target_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        controller.value(&FieldKey::new("slug")).expect("slug"),
        FieldValue::text("hello")
    );
}

#[test]
fn field_change_hook_runs_after_field_on_change() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let field_order = order.clone();
    let amount = ValueField::number("amount").on_change(move |_value, draft, _internals| {
        field_order.lock().expect("order").push("field");
        draft.set("total", 0_i64);
    });
    let controller = controller(vec![amount.clone().into()], FormValues::new(), FormOptions::default());
    let hook_order = order.clone();
    controller
        .register_field_change_hook(move |name, value, previous, draft| {
            hook_order.lock().expect("order").push("hook");
            assert_eq!(name.as_str(), "amount");
            assert!(previous.get_named("amount").is_blank());
            assert_eq!(draft.get_named("total"), &FieldValue::from(0_i64));
            draft.set("total", value.clone());
        })
        .expect("register hook");

    controller.update_item(7_i64, &amount).expect("update");

    assert_eq!(*order.lock().expect("order"), ["field", "hook"]);
    assert_eq!(
        controller.value(&FieldKey::new("total")).expect("total"),
        FieldValue::from(7_i64)
    );
}

#[test]
fn check_item_patches_only_its_field() {
    let email = email_field();
    let name = ValueField::input("name").required(true);
    let controller = controller(
        vec![email.clone().into(), name.clone().into()],
        FormValues::new(),
        FormOptions::default(),
    );
    controller.on_check_submit(None).expect("submit");

    controller.update_item("a@b.com", &email).expect("update");
    assert!(controller.check_item(&email).expect("check").is_none());

    let errors = controller.errors().expect("errors");
    assert_eq!(message(&errors, "email"), None);
    assert!(message(&errors, "name").is_some());
}

#[test]
fn check_item_with_value_does_not_commit() {
    let email = email_field();
    let controller = controller(vec![email.clone().into()], FormValues::new(), FormOptions::default());

    let _ = controller.check_item_with_value("", &email).expect("check");

    assert!(controller.error(&FieldKey::new("email")).expect("error").is_some());
    assert!(!controller.values().expect("values").contains_key(&FieldKey::new("email")));
    assert!(!controller.is_modified().expect("modified"));
}

#[test]
fn submit_on_edit_checks_the_hypothetical_form() {
    let email = email_field();
    let name = ValueField::input("name");
    let controller = controller(
        vec![email.clone().into(), name.into()],
        FormValues::from_iter([("name", "Ann")]),
        FormOptions {
            edit_mode: EditMode::SubmitOnEdit,
            ..FormOptions::default()
        },
    );
    let submitted = recording_handler(&controller);

    assert!(controller.check_item_with_value("", &email).expect("failing check").is_none());
    assert_eq!(controller.status().expect("status"), FormStatus::Invalid);
    assert!(submitted.lock().expect("submitted").is_empty());

    assert!(controller.check_item_with_value("a@b.com", &email).expect("passing check").is_none());
    let submitted = submitted.lock().expect("submitted");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].get_named("email"), &FieldValue::text("a@b.com"));
    assert_eq!(submitted[0].get_named("name"), &FieldValue::text("Ann"));
    assert!(controller.value(&FieldKey::new("email")).expect("value").is_blank());
}

#[test]
fn submit_on_edit_check_item_submits_stored_values() {
    let email = email_field();
    let name = ValueField::input("name").label("Name").required(true);
    let controller = controller(
        vec![email.clone().into(), name.into()],
        FormValues::from_iter([("email", "a@b.com"), ("name", "Ann")]),
        FormOptions {
            edit_mode: EditMode::SubmitOnEdit,
            ..FormOptions::default()
        },
    );
    let submitted = recording_handler(&controller);
    let mut stale = ErrorPatch::new();
    stale.insert("legacy".into(), Some("stale server message".into()));
    controller.server_error_reporter().report(stale).expect("report");
    assert!(controller.errors().expect("errors").has_errors());

    assert!(controller.check_item(&email).expect("check").is_none());

    let errors = controller.errors().expect("errors");
    assert!(!errors.contains_key(&FieldKey::new("legacy")));
    assert!(!errors.has_errors());
    {
        let submitted = submitted.lock().expect("submitted");
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0], controller.values().expect("values"));
    }

    controller
        .modify_form(|draft| draft.set("name", ""))
        .expect("clear name");
    assert!(controller.check_item(&email).expect("check").is_none());
    let errors = controller.errors().expect("errors");
    assert_eq!(message(&errors, "email"), None);
    assert_eq!(message(&errors, "name"), Some("Name is required".to_string()));
    assert_eq!(submitted.lock().expect("submitted").len(), 1);
}

#[test]
fn submit_on_edit_group_check_submits_merged_values_without_committing() {
    let group = CustomMultipleField::new(["from", "to"]).validate_multiple(|form, _field| {
        let mut patch = ErrorPatch::new();
        if form.get_named("to").is_blank() {
            patch.insert("to".into(), Some("missing end".into()));
        }
        patch
    });
    let controller = controller(
        vec![group.clone().into()],
        FormValues::from_iter([("from", "2024-01-01")]),
        FormOptions {
            edit_mode: EditMode::SubmitOnEdit,
            ..FormOptions::default()
        },
    );
    let submitted = recording_handler(&controller);

    let pending = controller
        .check_item_custom_multiple(FormValues::from_iter([("to", "2024-02-01")]), &group)
        .expect("check");

    assert!(pending.is_none());
    assert!(!controller.errors().expect("errors").has_errors());
    let submitted = submitted.lock().expect("submitted");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].get_named("from"), &FieldValue::text("2024-01-01"));
    assert_eq!(submitted[0].get_named("to"), &FieldValue::text("2024-02-01"));
    assert!(!controller.values().expect("values").contains_key(&FieldKey::new("to")));
    assert!(!controller.is_modified().expect("modified"));
}

#[test]
fn server_errors_replace_the_error_map() {
    let email = email_field();
    let controller = controller(
        vec![email.into()],
        FormValues::from_iter([("email", "a@b.com")]),
        FormOptions::default(),
    );
    let reporter_slot: Arc<Mutex<Option<ServerErrorReporter>>> = Arc::new(Mutex::new(None));
    let slot = reporter_slot.clone();
    controller
        .register_submit_handler(move |_values, reporter| {
            *slot.lock().expect("reporter slot") = Some(reporter);
        })
        .expect("register submit handler");

    assert!(controller.on_check_submit(None).expect("submit"));
    let reporter = reporter_slot
        .lock()
        .expect("reporter slot")
        .take()
        .expect("handler received a reporter");

    let mut server = ErrorPatch::new();
    server.insert("email".into(), Some("already registered".into()));
    reporter.report(server).expect("report");

    let errors = controller.errors().expect("errors");
    assert_eq!(message(&errors, "email"), Some("already registered".to_string()));
    assert_eq!(errors.len(), 1);
    assert_eq!(controller.status().expect("status"), FormStatus::Invalid);

    drop(controller);
    reporter.report(ErrorPatch::new()).expect("report after drop is a no-op");
}

#[test]
fn hidden_errors_persist_unless_cleared_eagerly() {
    let flagged = |form: &FormValues| form.get_named("flag") == &FieldValue::Bool(true);
    let flag = ValueField::switch("flag");
    let schema = || -> Schema {
        vec![
            ValueField::switch("flag").into(),
            ValueField::input("detail").required(true).should_hide(flagged).into(),
        ]
    };

    let keeping = controller(schema(), FormValues::new(), FormOptions::default());
    keeping.on_check_submit(None).expect("submit");
    keeping.update_item(true, &flag).expect("hide detail");
    assert!(keeping.error(&FieldKey::new("detail")).expect("error").is_some());

    let clearing = controller(
        schema(),
        FormValues::new(),
        FormOptions {
            clear_hidden_errors: true,
            ..FormOptions::default()
        },
    );
    clearing.on_check_submit(None).expect("submit");
    clearing.update_item(true, &flag).expect("hide detail");
    assert!(clearing.error(&FieldKey::new("detail")).expect("error").is_none());
}

#[test]
fn async_validator_runs_only_after_sync_pass() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let email = email_field().async_validator(move |value, _field, _form| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { (value.as_text() == Some("taken@b.com")).then(|| SharedString::from("taken")) }
    });
    let controller = controller(vec![email.clone().into()], FormValues::new(), FormOptions::default());

    assert!(controller.check_item_with_value("", &email).expect("check").is_none());

    let pending = controller
        .check_item_with_value("taken@b.com", &email)
        .expect("check")
        .expect("async validation pending");
    assert_eq!(pending.key(), &FieldKey::new("email"));
    assert!(block_on(pending.run()).expect("run"));
    assert_eq!(
        message(&controller.errors().expect("errors"), "email"),
        Some("taken".to_string())
    );

    controller.on_check_submit(None).expect("submit");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn later_check_supersedes_earlier_async_result() {
    let email = ValueField::input("email").async_validator(|value, _field, _form| async move {
        (value.as_text() == Some("taken")).then(|| SharedString::from("taken"))
    });
    let controller = controller(vec![email.clone().into()], FormValues::new(), FormOptions::default());

    let first = controller
        .check_item_with_value("taken", &email)
        .expect("first check")
        .expect("first pending");
    let second = controller
        .check_item_with_value("free", &email)
        .expect("second check")
        .expect("second pending");
    assert!(second.ticket() > first.ticket());

    assert!(block_on(second.run()).expect("second run"));
    assert!(!block_on(first.run()).expect("first run"));
    assert_eq!(controller.error(&FieldKey::new("email")).expect("error"), None);
}

#[test]
fn async_result_arriving_after_newer_check_is_dropped() {
    let gate: Arc<Mutex<Option<oneshot::Receiver<Option<SharedString>>>>> =
        Arc::new(Mutex::new(None));
    let validator_gate = gate.clone();
    let email = email_field().async_validator(move |_value, _field, _form| {
        let receiver = validator_gate.lock().expect("gate").take();
        async move {
            match receiver {
                Some(receiver) => receiver.await.unwrap_or(None),
                None => None,
            }
        }
    });
    let controller = controller(vec![email.clone().into()], FormValues::new(), FormOptions::default());

    let (sender, receiver) = oneshot::channel();
    *gate.lock().expect("gate") = Some(receiver);
    let pending = controller
        .check_item_with_value("slow@b.com", &email)
        .expect("check")
        .expect("pending");
    let worker = thread::spawn(move || block_on(pending.run()));

    let _ = controller.check_item_with_value("", &email).expect("newer check");
    sender
        .send(Some("server says no".into()))
        .expect("worker still waiting");

    assert!(!worker.join().expect("worker joins").expect("run"));
    assert_eq!(
        message(&controller.errors().expect("errors"), "email"),
        Some("Email is required".to_string())
    );
}

#[test]
fn debounced_validation_skips_superseded_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let name = ValueField::input("name")
        .async_debounce(Duration::from_millis(20))
        .async_validator(move |_value, _field, _form| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { None }
        });
    let controller = controller(vec![name.clone().into()], FormValues::new(), FormOptions::default());

    let first = controller
        .check_item_with_value("a", &name)
        .expect("first check")
        .expect("first pending");
    let second = controller
        .check_item_with_value("ab", &name)
        .expect("second check")
        .expect("second pending");

    assert!(!block_on(first.run()).expect("first run"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(block_on(second.run()).expect("second run"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn submit_and_reset_supersede_pending_async_results() {
    let email = ValueField::input("email")
        .async_validator(|_value, _field, _form| async { Some(SharedString::from("late")) });
    let controller = controller(vec![email.clone().into()], FormValues::new(), FormOptions::default());

    let pending = controller
        .check_item_with_value("x", &email)
        .expect("check")
        .expect("pending");
    controller.on_check_submit(None).expect("submit");
    assert!(!block_on(pending.run()).expect("run"));

    let pending = controller
        .check_item_with_value("x", &email)
        .expect("check")
        .expect("pending");
    controller.reset_form().expect("reset");
    assert!(!block_on(pending.run()).expect("run"));
    assert!(controller.errors().expect("errors").is_empty());
}

#[test]
fn async_multiple_validation_runs_after_sync_group_pass() {
    let group = CustomMultipleField::new(["lat", "lng"])
        .validate_multiple(|_form, _field| ErrorPatch::new())
        .async_validate_multiple(|form, _field| async move {
            let mut patch = ErrorPatch::new();
            if form.get_named("lat") == &FieldValue::from(91_i64) {
                patch.insert("lat".into(), Some("out of range".into()));
            }
            patch
        });
    let controller = controller(vec![group.clone().into()], FormValues::new(), FormOptions::default());

    let pending = controller
        .check_item_custom_multiple(FormValues::from_iter([("lat", 91_i64)]), &group)
        .expect("check")
        .expect("pending");
    assert!(block_on(pending.run()).expect("run"));

    let errors = controller.errors().expect("errors");
    assert_eq!(message(&errors, "lat"), Some("out of range".to_string()));
    assert_eq!(message(&errors, "lng"), None);
}

#[test]
fn group_check_supersedes_pending_field_result() {
    let lat = ValueField::number("lat")
        .async_validator(|_value, _field, _form| async { Some(SharedString::from("late")) });
    let group = CustomMultipleField::new(["lat", "lng"]).validate_multiple(|_form, _field| ErrorPatch::new());
    let controller = controller(
        vec![lat.clone().into(), group.clone().into()],
        FormValues::new(),
        FormOptions::default(),
    );

    let pending = controller
        .check_item_with_value(91_i64, &lat)
        .expect("field check")
        .expect("field pending");
    assert!(
        controller
            .check_item_custom_multiple(FormValues::from_iter([("lat", 45_i64)]), &group)
            .expect("group check")
            .is_none()
    );

    assert!(!block_on(pending.run()).expect("run"));
    assert_eq!(message(&controller.errors().expect("errors"), "lat"), None);
}

#[test]
fn field_check_supersedes_pending_group_result() {
    let lat = ValueField::number("lat");
    let note = ValueField::input("note");
    let group = CustomMultipleField::new(["lat", "lng"])
        .validate_multiple(|_form, _field| ErrorPatch::new())
        .async_validate_multiple(|_form, _field| async {
            let mut patch = ErrorPatch::new();
            patch.insert("lat".into(), Some("out of range".into()));
            patch
        });
    let controller = controller(
        vec![lat.clone().into(), note.clone().into(), group.clone().into()],
        FormValues::new(),
        FormOptions::default(),
    );

    let pending = controller
        .check_item_custom_multiple(FormValues::new(), &group)
        .expect("group check")
        .expect("group pending");
    let _ = controller.check_item_with_value("hello", &note).expect("unrelated check");
    let _ = controller.check_item_with_value(45_i64, &lat).expect("member check");

    assert!(!block_on(pending.run()).expect("run"));
    assert_eq!(message(&controller.errors().expect("errors"), "lat"), None);

    let pending = controller
        .check_item_custom_multiple(FormValues::new(), &group)
        .expect("group check")
        .expect("group pending");
    let _ = controller.check_item_with_value("again", &note).expect("unrelated check");
    assert!(block_on(pending.run()).expect("run"));
    assert_eq!(
        message(&controller.errors().expect("errors"), "lat"),
        Some("out of range".to_string())
    );
}

#[test]
fn bindings_route_edits_through_the_controller() {
    let email = email_field();
    let group = CustomMultipleField::new(["from", "to"]).validate_multiple(|form, _field| {
        let mut patch = ErrorPatch::new();
        if form.get_named("to").is_blank() {
            patch.insert("to".into(), Some("missing end".into()));
        }
        patch
    });
    let controller = controller(
        vec![email.clone().into(), group.clone().into()],
        FormValues::new(),
        FormOptions::default(),
    );

    let binding = controller.field_binding(&email).expect("field binding");
    assert_eq!(binding.value, FieldValue::Empty);
    binding.on_change("a@b.com").expect("on_change");
    assert!(binding.on_check("").expect("on_check").is_none());

    let binding = controller.field_binding(&email).expect("field binding");
    assert_eq!(binding.value, FieldValue::text("a@b.com"));
    assert_eq!(binding.error.map(|m| m.to_string()), Some("Email is required".to_string()));

    let multiple = controller.multiple_binding(&group).expect("multiple binding");
    multiple
        .modify_form(|draft| draft.set("from", "2024-01-01"))
        .expect("modify form");
    let _ = multiple
        .check_form(FormValues::from_iter([("to", "2024-02-01")]))
        .expect("check form");
    assert_eq!(message(&controller.errors().expect("errors"), "to"), None);
    assert_eq!(
        controller.value(&FieldKey::new("from")).expect("value"),
        FieldValue::text("2024-01-01")
    );
}

#[test]
fn field_lookup_reports_unknown_names() {
    let controller = controller(
        vec![FieldDescriptor::fragment(vec![email_field().into()]).into()],
        FormValues::new(),
        FormOptions::default(),
    );
    assert_eq!(controller.field("email").expect("email field").name, FieldKey::new("email"));
    assert_eq!(
        controller.field("nope").err(),
        Some(FormError::UnknownField(FieldKey::new("nope")))
    );
}

#[test]
fn readers_keep_their_snapshot_across_updates() {
    let email = email_field();
    let controller = controller(vec![email.clone().into()], FormValues::new(), FormOptions::default());
    let before = controller.snapshot().expect("snapshot");

    controller.update_item("a@b.com", &email).expect("update");
    controller.on_check_submit(None).expect("submit");

    assert!(before.values.get_named("email").is_blank());
    assert!(!before.modified);
    assert_ne!(before.values, controller.values().expect("values"));
    assert_eq!(before.id, controller.form_id().expect("form id"));
}

#[gpui::test]
fn render_field_dispatches_registered_renderers(cx: &mut TestAppContext) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let registry = RendererRegistry::new();
    registry.register("rating", move |binding, options, _window, _cx| {
        sink.lock()
            .expect("seen")
            .push((binding.field.name.clone(), binding.value.clone(), options.clone()));
        div().into_any_element()
    });

    let stars: FieldDescriptor = ValueField::registered("stars", "rating", FieldValue::from(5_i64)).into();
    let mood: FieldDescriptor = ValueField::registered("mood", "emoji-picker", FieldValue::Empty).into();
    let secret: FieldDescriptor = ValueField::registered("secret", "rating", FieldValue::Empty)
        .should_hide(|_form| true)
        .into();
    let plain: FieldDescriptor = ValueField::input("plain").into();
    let controller = controller(
        vec![stars.clone(), mood.clone(), secret.clone(), plain.clone()],
        FormValues::from_iter([("stars", 3_i64)]),
        FormOptions::default(),
    );

    cx.add_empty_window().update(|window, cx| {
        let rendered = controller
            .render_field(&stars, &registry, window, cx)
            .expect("render stars");
        assert!(rendered.is_some());
        let placeholder = controller
            .render_field(&mood, &registry, window, cx)
            .expect("render missing renderer");
        assert!(placeholder.is_some());
        assert!(
            controller
                .render_field(&secret, &registry, window, cx)
                .expect("render hidden")
                .is_none()
        );
        assert!(
            controller
                .render_field(&plain, &registry, window, cx)
                .expect("render built-in")
                .is_none()
        );
    });

    let seen = seen.lock().expect("seen");
    assert_eq!(
        *seen,
        [(FieldKey::new("stars"), FieldValue::from(3_i64), FieldValue::from(5_i64))]
    );
}
