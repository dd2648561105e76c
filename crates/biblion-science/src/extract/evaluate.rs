//! Node evaluators: turn one path hit into one raw value.

use biblion_core::EvaluatorKind;

use crate::xml::{Document, Hit, NodeId};

/// Evaluate `hit` with `kind`. `None` means the hit yields no value.
pub fn evaluate(kind: EvaluatorKind, doc: &Document, hit: Hit) -> Option<String> {
    let value = match (kind, hit) {
        (EvaluatorKind::Text | EvaluatorKind::Attribute, hit) => Some(hit.value(doc)),
        (_, Hit::Attribute(..)) => Some(hit.value(doc)),
        (EvaluatorKind::PersonName, Hit::Node(node)) => person_name(doc, node),
        (EvaluatorKind::TitleWithSubtitle, Hit::Node(node)) => title_with_subtitle(doc, node),
        (EvaluatorKind::IdValue, Hit::Node(node)) => id_value(doc, node),
        (EvaluatorKind::OnixDate, Hit::Node(node)) => onix_date(doc, node),
        (EvaluatorKind::DateParts, Hit::Node(node)) => date_parts(doc, node),
    };
    value.filter(|v| !v.is_empty())
}

/// First non-empty text among the children named in `names`.
fn child_text_any(doc: &Document, node: NodeId, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| doc.child_text(node, name))
}

/// `Surname, Given names` from whichever name parts the node carries.
///
/// Understands ONIX contributors (long and short tags) and JATS
/// `name`/`string-name` elements. Falls back to the node's text.
fn person_name(doc: &Document, node: NodeId) -> Option<String> {
    if let Some(inverted) = child_text_any(doc, node, &["PersonNameInverted", "b037"]) {
        return Some(inverted);
    }

    // JATS contributors wrap the parts in a <name> element
    let holder = ["name", "string-name"]
        .iter()
        .find_map(|n| doc.child(node, n))
        .unwrap_or(node);

    let surname = child_text_any(doc, holder, &["KeyNames", "b040", "surname"]);
    let given = child_text_any(doc, holder, &["NamesBeforeKey", "b039", "given-names"]);
    match (surname, given) {
        (Some(surname), Some(given)) => return Some(format!("{surname}, {given}")),
        (Some(surname), None) => return Some(surname),
        _ => {}
    }

    child_text_any(
        doc,
        holder,
        &["PersonName", "b036", "CorporateName", "b047", "collab"],
    )
    .or_else(|| Some(doc.text(holder)))
}

/// `Title: Subtitle`, or `Prefix Title: Subtitle` when the title is split.
fn title_with_subtitle(doc: &Document, node: NodeId) -> Option<String> {
    let subtitle = child_text_any(doc, node, &["Subtitle", "b029", "subtitle"]);
    let title = child_text_any(doc, node, &["TitleText", "b203", "article-title", "title"])
        .or_else(|| {
            let without = child_text_any(doc, node, &["TitleWithoutPrefix", "b031"])?;
            Some(match child_text_any(doc, node, &["TitlePrefix", "b030"]) {
                Some(prefix) => format!("{prefix} {without}"),
                None => without,
            })
        })?;
    Some(match subtitle {
        Some(subtitle) => format!("{title}: {subtitle}"),
        None => title,
    })
}

/// The `IDValue` of an ONIX identifier composite; the path already
/// selected the identifier type.
fn id_value(doc: &Document, node: NodeId) -> Option<String> {
    child_text_any(doc, node, &["IDValue", "b244"])
}

/// ONIX publishing or market date, normalized to W3C form.
///
/// Only roles 01 (publication), 11 and 12 are kept. Format `00`
/// (the default) is `YYYYMMDD`; formats `01`–`05` start with the year.
fn onix_date(doc: &Document, node: NodeId) -> Option<String> {
    let role = child_text_any(
        doc,
        node,
        &["PublishingDateRole", "x448", "MarketDateRole", "j408"],
    )?;
    if !matches!(role.as_str(), "01" | "11" | "12") {
        return None;
    }

    let date_node = doc.child(node, "Date").or_else(|| doc.child(node, "b306"))?;
    let date = doc.text(date_node);
    let format = doc
        .attr(date_node, "dateformat")
        .or_else(|| doc.attr(date_node, "j260"))
        .filter(|f| !f.is_empty())
        .unwrap_or("00");

    let ascii = date.is_ascii();
    Some(match format {
        "00" if ascii && date.len() > 7 => {
            format!("{}-{}-{}", &date[..4], &date[4..6], &date[6..8])
        }
        "01" | "02" | "03" | "04" | "05" if ascii && date.len() >= 4 => date[..4].to_string(),
        _ => date,
    })
}

/// `YYYY-MM-DD` from separate year, month and day children, shortened
/// to `YYYY-MM` or `YYYY` when the finer parts are missing or not numeric.
fn date_parts(doc: &Document, node: NodeId) -> Option<String> {
    let year = doc.child_text(node, "year")?;
    let part = |name: &str| {
        doc.child_text(node, name)
            .and_then(|v| v.trim().parse::<u8>().ok())
            .filter(|n| *n > 0)
    };
    Some(match (part("month"), part("day")) {
        (Some(month), Some(day)) => format!("{year}-{month:02}-{day:02}"),
        (Some(month), None) => format!("{year}-{month:02}"),
        _ => year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XPath;

    fn eval_first(xml: &str, path: &str, kind: EvaluatorKind) -> Option<String> {
        let doc = Document::parse(xml).unwrap();
        let hit = XPath::compile(path).unwrap().select(&doc, doc.root())[0];
        evaluate(kind, &doc, hit)
    }

    #[test]
    fn test_person_name_variants() {
        let onix = "<Contributor><ContributorRole>A01</ContributorRole>\
                    <NamesBeforeKey>Jane</NamesBeforeKey><KeyNames>Doe</KeyNames></Contributor>";
        assert_eq!(
            eval_first(onix, "/Contributor", EvaluatorKind::PersonName).as_deref(),
            Some("Doe, Jane")
        );

        let jats = "<contrib><name><surname>Smith</surname><given-names>J. R.</given-names></name></contrib>";
        assert_eq!(
            eval_first(jats, "/contrib", EvaluatorKind::PersonName).as_deref(),
            Some("Smith, J. R.")
        );

        let inverted = "<Contributor><PersonName>Ann Lee</PersonName>\
                        <PersonNameInverted>Lee, Ann</PersonNameInverted></Contributor>";
        assert_eq!(
            eval_first(inverted, "/Contributor", EvaluatorKind::PersonName).as_deref(),
            Some("Lee, Ann")
        );
    }

    #[test]
    fn test_title_with_subtitle() {
        let plain = "<TitleElement><TitleText>Rust</TitleText><Subtitle>In Practice</Subtitle></TitleElement>";
        assert_eq!(
            eval_first(plain, "/TitleElement", EvaluatorKind::TitleWithSubtitle).as_deref(),
            Some("Rust: In Practice")
        );
        let split = "<TitleElement><TitlePrefix>The</TitlePrefix><TitleWithoutPrefix>Book</TitleWithoutPrefix></TitleElement>";
        assert_eq!(
            eval_first(split, "/TitleElement", EvaluatorKind::TitleWithSubtitle).as_deref(),
            Some("The Book")
        );
        assert_eq!(
            eval_first("<TitleElement/>", "/TitleElement", EvaluatorKind::TitleWithSubtitle),
            None
        );
    }

    #[test]
    fn test_onix_dates() {
        let date = |role: &str, format: &str, value: &str| {
            let attr = if format.is_empty() {
                String::new()
            } else {
                format!(" dateformat=\"{format}\"")
            };
            let xml = format!(
                "<PublishingDate><PublishingDateRole>{role}</PublishingDateRole><Date{attr}>{value}</Date></PublishingDate>"
            );
            eval_first(&xml, "/PublishingDate", EvaluatorKind::OnixDate)
        };
        assert_eq!(date("01", "", "20200315").as_deref(), Some("2020-03-15"));
        assert_eq!(date("01", "05", "2020").as_deref(), Some("2020"));
        assert_eq!(date("11", "01", "202003").as_deref(), Some("2020"));
        assert_eq!(date("01", "13", "2020W12").as_deref(), Some("2020W12"));
        assert_eq!(date("02", "", "20200315"), None);
    }

    #[test]
    fn test_date_parts() {
        let date = |xml: &str| eval_first(xml, "/pub-date", EvaluatorKind::DateParts);
        assert_eq!(
            date("<pub-date><day>7</day><month>4</month><year>2020</year></pub-date>").as_deref(),
            Some("2020-04-07")
        );
        assert_eq!(
            date("<pub-date><month>11</month><year>2020</year></pub-date>").as_deref(),
            Some("2020-11")
        );
        assert_eq!(
            date("<pub-date><season>Spring</season><year>2020</year></pub-date>").as_deref(),
            Some("2020")
        );
        assert_eq!(date("<pub-date><month>4</month></pub-date>"), None);
    }

    #[test]
    fn test_id_value_and_attribute() {
        let xml = "<ProductIdentifier type=\"x\"><ProductIDType>15</ProductIDType><IDValue>9780306406157</IDValue></ProductIdentifier>";
        assert_eq!(
            eval_first(xml, "/ProductIdentifier", EvaluatorKind::IdValue).as_deref(),
            Some("9780306406157")
        );
        assert_eq!(
            eval_first(xml, "/ProductIdentifier/@type", EvaluatorKind::Attribute).as_deref(),
            Some("x")
        );
    }
}
