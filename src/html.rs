use maud::{DOCTYPE, Markup, PreEscaped, html};

// Button styles
pub const BUTTON_PRIMARY_STYLE: &str = "button";

// Form styles
pub const FORM_TEXT_INPUT_STYLE: &str = "form-control";

pub enum HeadElement {
    /// JavaScript source code.
    ScriptSource(PreEscaped<&'static str>),
    Style(PreEscaped<&'static str>),
}

/// Styles shared by every page.
const BASE_STYLE: &str = r#"
body {
    margin: 0;
    padding: 0;
    font-family: Arial, sans-serif;
    background-color: #01864d;
    color: #fff;
}

.error-page {
    padding: 4rem 1rem;
    text-align: center;
}

.error-page h1 {
    font-size: 6rem;
    margin-bottom: 1rem;
}

.error-page a {
    color: #fff;
}
"#;

pub fn base(title: &str, head_elements: &[HeadElement], content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }

                style { (PreEscaped(BASE_STYLE)) }

                @for element in head_elements
                {
                    @match element
                    {
                        HeadElement::ScriptSource(text) => script { (text) }
                        HeadElement::Style(text) => style { (text) }
                    }
                }
            }

            body
            {
                (content)
            }
        }
    }
}

pub fn error_view(title: &str, header: &str, description: &str, fix: &str) -> Markup {
    let content = html!(
        section class="error-page"
        {
            h1 { (header) }

            p class="description" { (description) }

            p class="fix" { (fix) }

            a href="/" { "Back to Homepage" }
        }
    );

    base(title, &[], &content)
}

/// An indeterminate spinner, hidden until a script shows it.
pub fn loading_spinner(id: &str) -> Markup {
    html! {
        div id=(id) class="loading" role="status" aria-label="Loading" style="display: none;" {}
    }
}
