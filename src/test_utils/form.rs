//! Assertions on the sign-up, log-in and transaction forms.

use scraper::{ElementRef, Html, Selector};

use crate::html::ERROR_MESSAGE_STYLE;

#[track_caller]
pub(crate) fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&Selector::parse("form").unwrap())
        .next()
        .expect("No form found")
}

/// Check the HTMX attribute, e.g. `hx-post`, that decides where the form goes.
#[track_caller]
pub(crate) fn assert_hx_endpoint(form: &ElementRef<'_>, endpoint: &str, attribute: &str) {
    let got = form
        .value()
        .attr(attribute)
        .unwrap_or_else(|| panic!("form has no {attribute} attribute"));

    assert_eq!(got, endpoint, "want {attribute}=\"{endpoint}\", got {got:?}");
}

#[track_caller]
fn must_get_required_input<'a>(
    form: &ElementRef<'a>,
    name: &str,
    type_: &str,
) -> ElementRef<'a> {
    let input = form
        .select(&Selector::parse(&format!("input[name=\"{name}\"]")).unwrap())
        .next()
        .unwrap_or_else(|| panic!("No input found with name \"{name}\""));

    let got_type = input.value().attr("type").unwrap_or_default();
    assert_eq!(got_type, type_, "want {name} input of type \"{type_}\", got {got_type:?}");
    assert!(
        input.value().attr("required").is_some(),
        "want {name} input to be required"
    );

    input
}

#[track_caller]
pub(crate) fn assert_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    must_get_required_input(form, name, type_);
}

/// Check that a rejected submission kept what the user typed.
#[track_caller]
pub(crate) fn assert_form_input_with_value(
    form: &ElementRef<'_>,
    name: &str,
    type_: &str,
    value: &str,
) {
    let input = must_get_required_input(form, name, type_);

    let got_value = input.value().attr("value").unwrap_or_default();
    assert_eq!(got_value, value, "want {name} input to hold {value:?}");
}

#[track_caller]
pub(crate) fn assert_form_submit_button(form: &ElementRef<'_>) {
    let button = form
        .select(&Selector::parse("button").unwrap())
        .next()
        .expect("No button found");

    assert_eq!(button.value().attr("type"), Some("submit"));
}

/// Check the first error shown in the form.
#[track_caller]
pub(crate) fn assert_form_error_message(form: &ElementRef<'_>, want_error_message: &str) {
    let selector = Selector::parse(&format!("p[class=\"{ERROR_MESSAGE_STYLE}\"]")).unwrap();
    let got = form
        .select(&selector)
        .next()
        .expect("No error message found")
        .text()
        .collect::<String>();

    assert_eq!(got.trim(), want_error_message);
}
