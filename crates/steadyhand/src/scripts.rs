//! In-page scripts used as fallback invocations.
//!
//! These bypass native input simulation and hit testing. The executor runs
//! them only after a native invocation failed.

use serde_json::Value;

use crate::session::{Action, AutomationSession, ElementRef, ScriptArg, SelectOption, SessionError};

/// Programmatic click
pub const CLICK_SCRIPT: &str = "arguments[0].click();";

/// Assign a value and fire the events frameworks listen to
pub const SET_VALUE_SCRIPT: &str = "\
var el = arguments[0];
el.value = arguments[1];
el.dispatchEvent(new Event('input', { bubbles: true }));
el.dispatchEvent(new Event('change', { bubbles: true }));";

/// Choose a `<select>` option by `text`, `value` or `index`; returns whether it matched
pub const SELECT_OPTION_SCRIPT: &str = "\
var el = arguments[0], mode = arguments[1], wanted = arguments[2];
var options = Array.prototype.slice.call(el.options || []);
var idx = -1;
if (mode === 'index') { idx = wanted < options.length ? wanted : -1; }
else { idx = options.findIndex(function (o) {
  return mode === 'text' ? o.text.trim() === wanted : o.value === wanted; }); }
if (idx < 0) { return false; }
el.selectedIndex = idx;
el.dispatchEvent(new Event('change', { bubbles: true }));
return true;";

/// Scroll the element to the centre of the viewport
pub const SCROLL_INTO_VIEW_SCRIPT: &str =
    "arguments[0].scrollIntoView({ block: 'center', inline: 'center' });";

/// Script and arguments that perform `action` on `element` without native input
#[must_use]
pub fn invocation_for(element: &ElementRef, action: &Action) -> (&'static str, Vec<ScriptArg>) {
    match action {
        Action::Click => (CLICK_SCRIPT, vec![element.into()]),
        Action::SetValue(text) => (SET_VALUE_SCRIPT, vec![element.into(), text.as_str().into()]),
        Action::Select(option) => {
            let (mode, wanted): (&str, ScriptArg) = match option {
                SelectOption::Text(text) => ("text", text.as_str().into()),
                SelectOption::Value(value) => ("value", value.as_str().into()),
                SelectOption::Index(index) => ("index", (*index).into()),
            };
            (SELECT_OPTION_SCRIPT, vec![element.into(), mode.into(), wanted])
        }
    }
}

/// Perform `action` through script.
///
/// A select whose option does not exist fails with `NoSuchElement`.
pub fn invoke(
    session: &dyn AutomationSession,
    element: &ElementRef,
    action: &Action,
) -> Result<(), SessionError> {
    let (script, args) = invocation_for(element, action);
    let result = session.execute_script(script, &args)?;
    match (action, result) {
        (Action::Select(option), Value::Bool(false)) => Err(SessionError::no_such_element(
            format!("no option matching {option}"),
        )),
        _ => Ok(()),
    }
}

/// Scroll the element into view
pub fn scroll_into_view(
    session: &dyn AutomationSession,
    element: &ElementRef,
) -> Result<(), SessionError> {
    session
        .execute_script(SCROLL_INTO_VIEW_SCRIPT, &[element.into()])
        .map(|_| ())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::locator::Locator;
    use crate::mock::{MockElement, MockSession};

    #[test]
    fn test_click_invocation() {
        let el = ElementRef::new("e1");
        let (script, args) = invocation_for(&el, &Action::Click);
        assert_eq!(script, CLICK_SCRIPT);
        assert_eq!(args, vec![ScriptArg::Element(el)]);
    }

    #[test]
    fn test_select_by_index_arguments() {
        let el = ElementRef::new("e1");
        let (script, args) = invocation_for(&el, &Action::Select(SelectOption::Index(2)));
        assert_eq!(script, SELECT_OPTION_SCRIPT);
        assert_eq!(args[1], ScriptArg::from("index"));
        assert_eq!(args[2], ScriptArg::from(2usize));
    }

    #[test]
    fn test_invoke_set_value_updates_mock() {
        let session = MockSession::new();
        let el = session.add_element(&Locator::id("email"), MockElement::new());
        invoke(&session, &el, &Action::SetValue("a@b.c".into())).unwrap();
        assert_eq!(session.attribute_of(&el, "value").as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_invoke_select_missing_option() {
        let session = MockSession::new();
        let el = session.add_element(
            &Locator::id("country"),
            MockElement::new().with_options(["Germany", "France"]),
        );
        let err = invoke(
            &session,
            &el,
            &Action::Select(SelectOption::Text("Spain".into())),
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::session::SessionErrorKind::NoSuchElement);

        invoke(&session, &el, &Action::Select(SelectOption::Text("France".into()))).unwrap();
        assert_eq!(session.attribute_of(&el, "value").as_deref(), Some("France"));
    }

    #[test]
    fn test_scroll_into_view_records_script() {
        let session = MockSession::new();
        let el = session.add_element(&Locator::id("footer"), MockElement::new());
        scroll_into_view(&session, &el).unwrap();
        assert_eq!(session.script_calls(SCROLL_INTO_VIEW_SCRIPT), 1);
    }
}
