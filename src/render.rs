//! XML rendering of notices (Airbrake notifier API v2).

use std::fmt::{self, Write};

use crate::{error::RenderError, notice::Notice, request::RequestContext};

pub const CONTENT_TYPE: &str = "text/xml";

const NOTIFIER_NAME: &str = "Airbrake Rust";
const NOTIFIER_VERSION: &str = env!("CARGO_PKG_VERSION");
const NOTIFIER_URL: &str = "https://airbrake.io";

/// Renders `notice` into the XML document posted to the endpoint.
pub fn render(notice: &Notice) -> Result<Vec<u8>, RenderError> {
    if notice.api_key.is_empty() {
        return Err(RenderError::MissingField("api-key"));
    }
    if notice.error_class.is_empty() {
        return Err(RenderError::MissingField("class"));
    }

    let mut out = String::with_capacity(1024 + notice.backtrace.len() * 128);
    write_notice(&mut out, notice)?;
    Ok(out.into_bytes())
}

fn write_notice(out: &mut String, notice: &Notice) -> fmt::Result {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, r#"<notice version="2.0">"#)?;
    writeln!(out, "  <api-key>{}</api-key>", Escaped(&notice.api_key))?;
    writeln!(out, "  <notifier>")?;
    writeln!(out, "    <name>{NOTIFIER_NAME}</name>")?;
    writeln!(out, "    <version>{NOTIFIER_VERSION}</version>")?;
    writeln!(out, "    <url>{NOTIFIER_URL}</url>")?;
    writeln!(out, "  </notifier>")?;

    writeln!(out, "  <error>")?;
    writeln!(out, "    <class>{}</class>", Escaped(&notice.error_class))?;
    writeln!(out, "    <message>{}</message>", Escaped(&notice.error_message))?;
    writeln!(out, "    <backtrace>")?;
    for frame in &notice.backtrace {
        writeln!(
            out,
            r#"      <line method="{}" file="{}" number="{}"/>"#,
            Escaped(&frame.function),
            Escaped(&frame.file),
            frame.line
        )?;
    }
    writeln!(out, "    </backtrace>")?;
    writeln!(out, "  </error>")?;

    if let Some(request) = &notice.request {
        write_request(out, request)?;
    }

    writeln!(out, "  <server-environment>")?;
    writeln!(
        out,
        "    <project-root>{}</project-root>",
        Escaped(&notice.project_root)
    )?;
    writeln!(
        out,
        "    <environment-name>{}</environment-name>",
        Escaped(&notice.environment)
    )?;
    if !notice.version.is_empty() {
        writeln!(out, "    <app-version>{}</app-version>", Escaped(&notice.version))?;
    }
    writeln!(out, "    <hostname>{}</hostname>", Escaped(&notice.hostname))?;
    writeln!(out, "  </server-environment>")?;
    write!(out, "</notice>")
}

fn write_request(out: &mut String, request: &RequestContext) -> fmt::Result {
    writeln!(out, "  <request>")?;
    writeln!(out, "    <url>{}</url>", Escaped(&request.url))?;
    writeln!(out, "    <component/>")?;
    writeln!(out, "    <action/>")?;

    let params = request
        .form_params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .chain(request.pretty_params.iter())
        .collect::<Vec<_>>();
    if !params.is_empty() {
        writeln!(out, "    <params>")?;
        for (key, value) in params {
            write_var(out, key, value)?;
        }
        writeln!(out, "    </params>")?;
    }

    writeln!(out, "    <cgi-data>")?;
    for (key, value) in &request.headers {
        write_var(out, key, value)?;
    }
    write_var(out, "METHOD", &request.method)?;
    write_var(out, "PROTOCOL", &request.protocol)?;
    writeln!(out, "    </cgi-data>")?;
    writeln!(out, "  </request>")
}

fn write_var(out: &mut String, key: &str, value: &str) -> fmt::Result {
    writeln!(
        out,
        r#"      <var key="{}">{}</var>"#,
        Escaped(key),
        Escaped(value)
    )
}

/// Writes its string with markup characters replaced by entities. Characters
/// XML 1.0 does not allow are replaced by U+FFFD.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut last = 0;
        for (index, c) in self.0.char_indices() {
            let replacement = match c {
                '&' => "&amp;",
                '<' => "&lt;",
                '>' => "&gt;",
                '"' => "&#34;",
                '\'' => "&#39;",
                '\t' | '\n' | '\r' => continue,
                '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => "\u{fffd}",
                _ => continue,
            };
            f.write_str(&self.0[last..index])?;
            f.write_str(replacement)?;
            last = index + c.len_utf8();
        }
        f.write_str(&self.0[last..])
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{config::Config, request::Request, stack::StackFrame};

    fn notice(request: Option<&Request>) -> Notice {
        let config = Config::builder()
            .api_key("abc123")
            .hostname("box-01")
            .project_root("/srv/app")
            .build();
        let backtrace = vec![
            StackFrame {
                function: "app::handler".to_owned(),
                file: "src/handler.rs".to_owned(),
                line: 12,
            },
            StackFrame {
                function: "app::main".to_owned(),
                file: "src/main.rs".to_owned(),
                line: 3,
            },
        ];
        Notice::new(
            &config,
            "std::io::error::Error",
            "Boom!".to_owned(),
            backtrace,
            request,
        )
    }

    fn rendered(notice: &Notice) -> String {
        String::from_utf8(render(notice).unwrap()).unwrap()
    }

    fn section<'a>(document: &'a str, open: &str, close: &str) -> &'a str {
        let start = document.find(open).expect("No opening tag");
        let end = document.find(close).expect("No closing tag") + close.len();
        &document[start..end]
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            Escaped(r#"<a href="x">Tom & Jerry's</a>"#).to_string(),
            "&lt;a href=&#34;x&#34;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
        assert_eq!(Escaped("tab\tnul\u{0}end").to_string(), "tab\tnul\u{fffd}end");
        assert_eq!(Escaped("plain ünïcode").to_string(), "plain ünïcode");
    }

    #[test]
    fn test_render_without_request() {
        let document = rendered(&notice(None));

        assert_eq!(
            document,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<notice version="2.0">
  <api-key>abc123</api-key>
  <notifier>
    <name>Airbrake Rust</name>
    <version>{}</version>
    <url>https://airbrake.io</url>
  </notifier>
  <error>
    <class>std::io::error::Error</class>
    <message>Boom!</message>
    <backtrace>
      <line method="app::handler" file="src/handler.rs" number="12"/>
      <line method="app::main" file="src/main.rs" number="3"/>
    </backtrace>
  </error>
  <server-environment>
    <project-root>/srv/app</project-root>
    <environment-name>development</environment-name>
    <hostname>box-01</hostname>
  </server-environment>
</notice>"#,
                env!("CARGO_PKG_VERSION")
            )
        );
        assert!(!document.contains("<request>"));
    }

    #[test]
    fn test_render_request() {
        let request = Request::builder()
            .url("/query?t=xxx&q=SHOW+x+BY+y+FROM+z")
            .build();
        let document = rendered(&notice(Some(&request)));

        assert_eq!(
            section(&document, "<request>", "</request>"),
            r#"<request>
    <url>/query?t=xxx&amp;q=SHOW+x+BY+y+FROM+z</url>
    <component/>
    <action/>
    <params>
      <var key="q">SHOW x BY y FROM z</var>
      <var key="t">xxx</var>
    </params>
    <cgi-data>
      <var key="METHOD">GET</var>
      <var key="PROTOCOL">HTTP/1.1</var>
    </cgi-data>
  </request>"#
        );
    }

    #[test]
    fn test_render_escapes_user_data() {
        let mut notice = notice(None);
        notice.error_message = "expected </message> & \"quotes\"".to_owned();
        notice.request = Some(RequestContext {
            url: "/x?a=<b>".to_owned(),
            method: "POST".to_owned(),
            protocol: "HTTP/2.0".to_owned(),
            form_params: vec![("k\"".to_owned(), "<v>".to_owned())]
                .into_iter()
                .collect(),
            headers: vec![("User-Agent".to_owned(), "a&b".to_owned())]
                .into_iter()
                .collect(),
            pretty_params: BTreeMap::new(),
        });
        let document = rendered(&notice);

        assert!(document
            .contains("<message>expected &lt;/message&gt; &amp; &#34;quotes&#34;</message>"));
        assert!(document.contains("<url>/x?a=&lt;b&gt;</url>"));
        assert!(document.contains(r#"<var key="k&#34;">&lt;v&gt;</var>"#));
        assert!(document.contains(r#"<var key="User-Agent">a&amp;b</var>"#));
        assert!(document.contains(r#"<var key="PROTOCOL">HTTP/2.0</var>"#));
    }

    #[test]
    fn test_render_skips_empty_params_and_appends_pretty_ones() {
        let request = Request::builder().url("/search?q=rust&page=").build();
        let mut notice = notice(None);
        let mut context = RequestContext::parse(&request, true).unwrap();
        context.headers.insert("Host".to_owned(), "example.org".to_owned());
        notice.request = Some(context);
        let document = rendered(&notice);

        assert_eq!(
            section(&document, "<params>", "</params>"),
            r#"<params>
      <var key="q">rust</var>
      <var key="?q">rust</var>
    </params>"#
        );
        assert!(document.contains(r#"<var key="Host">example.org</var>"#));
    }

    #[test]
    fn test_render_app_version() {
        let mut notice = notice(None);
        notice.version = "2.1.0".to_owned();
        let document = rendered(&notice);

        assert!(document.contains(
            "<environment-name>development</environment-name>\n    <app-version>2.1.0</app-version>\n    <hostname>box-01</hostname>"
        ));
    }

    #[test]
    fn test_render_requires_api_key() {
        let mut notice = notice(None);
        notice.api_key.clear();

        assert!(matches!(
            render(&notice),
            Err(RenderError::MissingField("api-key"))
        ));
    }
}
