//! User-Agent Stylesheet
//!
//! [WHATWG HTML § 15 Rendering](https://html.spec.whatwg.org/multipage/rendering.html)
//!
//! "User agents are expected to have a default style sheet that presents elements
//! of HTML documents in ways consistent with general user expectations."
//!
//! The sheet targets paged output: headings avoid breaking after themselves
//! and lengths are in points where the rendering section suggests ems.

/// [WHATWG HTML § 15.3 Rendering: Suggested default style sheet](https://html.spec.whatwg.org/multipage/rendering.html#the-css-user-agent-style-sheet-and-presentational-hints)
pub const UA_CSS: &str = r#"
/* [§ 15.3.1 Hidden elements] */
area, base, basefont, datalist, head, link, meta, noembed,
noframes, param, rp, script, style, template, title, [hidden] {
    display: none;
}

/* [§ 15.3.3 Flow content] */
address, article, aside, blockquote, body, center, dd, details,
dialog, dir, div, dl, dt, fieldset, figcaption, figure, footer,
form, h1, h2, h3, h4, h5, h6, header, hgroup, hr, html, legend,
listing, main, menu, nav, ol, p, plaintext, pre, search,
section, summary, ul, xmp {
    display: block;
}

body { margin: 8px; }
p, blockquote, figure, dl, pre { margin-top: 1em; margin-bottom: 1em; }
blockquote, figure { margin-left: 40px; margin-right: 40px; }
dd { margin-left: 40px; }
center { text-align: center; }
address { font-style: italic; }
hr { border: 1px inset; margin-top: 0.5em; margin-bottom: 0.5em; }

/* [§ 15.3.4 Phrasing content] */
cite, dfn, em, i, var { font-style: italic; }
b, strong, th { font-weight: bold; }
code, kbd, samp, tt, pre, listing, plaintext, xmp { font-family: monospace; }
pre, listing, plaintext, xmp { white-space: pre; }
u, ins { text-decoration: underline; }
s, strike, del { text-decoration: line-through; }
sub { vertical-align: sub; font-size: smaller; }
sup { vertical-align: super; font-size: smaller; }
small { font-size: smaller; }
big { font-size: larger; }
mark { background-color: yellow; color: black; }
a:link { color: #0000ee; text-decoration: underline; }
q::before { content: open-quote; }
q::after { content: close-quote; }
br { display: inline; }
nobr { white-space: nowrap; }

/* [§ 15.3.6 Sections and headings] */
h1 { font-size: 2em; margin-top: 0.67em; margin-bottom: 0.67em; }
h2 { font-size: 1.5em; margin-top: 0.83em; margin-bottom: 0.83em; }
h3 { font-size: 1.17em; margin-top: 1em; margin-bottom: 1em; }
h4 { font-size: 1em; margin-top: 1.33em; margin-bottom: 1.33em; }
h5 { font-size: 0.83em; margin-top: 1.67em; margin-bottom: 1.67em; }
h6 { font-size: 0.67em; margin-top: 2.33em; margin-bottom: 2.33em; }
h1, h2, h3, h4, h5, h6 { font-weight: bold; break-after: avoid; }

/* [§ 15.3.7 Lists] */
dir, menu, ol, ul { margin-top: 1em; margin-bottom: 1em; padding-left: 40px; }
ol ol, ol ul, ul ol, ul ul { margin-top: 0; margin-bottom: 0; }
ol { list-style-type: decimal; }
ul { list-style-type: disc; }
ul ul, ol ul { list-style-type: circle; }
ul ul ul, ul ol ul, ol ul ul, ol ol ul { list-style-type: square; }
li { display: list-item; }

/* [§ 15.3.8 Tables] */
table { display: table; border-collapse: separate; }
caption { display: table-caption; text-align: center; }
colgroup { display: table-column-group; }
col { display: table-column; }
thead { display: table-header-group; vertical-align: middle; }
tbody { display: table-row-group; vertical-align: middle; }
tfoot { display: table-footer-group; vertical-align: middle; }
tr { display: table-row; vertical-align: inherit; }
td, th { display: table-cell; vertical-align: inherit; padding: 1px; }
th { text-align: center; }
table, td, th { break-inside: avoid; }

/* [§ 15.5 Replaced elements and form controls] */
img, input, textarea, select, button { display: inline-block; }
input, textarea, select, button { border: 2px inset; padding: 1px 2px; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaContext;
    use crate::store::{CascadeOrigin, RuleStore};
    use quire_common::CollectingSink;

    #[test]
    fn test_ua_stylesheet_is_clean() {
        let sink = CollectingSink::new();
        let mut store = RuleStore::new(MediaContext::default());
        store.add_stylesheet(UA_CSS, CascadeOrigin::UserAgent, None, None, &sink);
        assert!(!store.is_empty());
        assert_eq!(sink.count_total(), 0, "{:?}", sink.snapshot());
    }
}
