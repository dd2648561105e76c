//! Built-in schemas for the common metadata formats.

use biblion_core::{
    CookEntry, CookedRecord, EvaluatorKind, FallbackConfig, FieldPathConfig, MetadataField,
    RawRecord, SchemaDefinition, SchemaKind, TypeBranchConfig, TypeRuleConfig,
};

use crate::cook::{RecordType, put_checked};
use crate::error::{Result, ScienceError};
use crate::schema::Schema;

pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    definition: fn() -> SchemaDefinition,
    fallbacks: fn() -> Vec<FallbackConfig>,
    post_cook: Option<fn(&mut CookedRecord, &RawRecord, Option<RecordType>)>,
}

impl Preset {
    pub fn definition(&self) -> SchemaDefinition {
        (self.definition)()
    }

    pub fn build(&self) -> Result<Schema> {
        let mut schema =
            Schema::from_definition(self.name, &self.definition())?.with_fallbacks(&(self.fallbacks)());
        if let Some(hook) = self.post_cook {
            schema = schema.with_post_cook(hook);
        }
        Ok(schema)
    }
}

pub static PRESETS: [Preset; 4] = [
    Preset {
        name: "ris",
        description: "RIS citation exports (TY/ER records), journal, book and chapter types",
        definition: ris_definition,
        fallbacks: ris_fallbacks,
        post_cook: Some(ris_post_cook),
    },
    Preset {
        name: "highwire_meta",
        description: "Highwire citation_* and Dublin Core meta tags on landing pages",
        definition: highwire_definition,
        fallbacks: highwire_fallbacks,
        post_cook: None,
    },
    Preset {
        name: "onix3",
        description: "ONIX 3 book records, deduplicated on ISBN-13",
        definition: onix3_definition,
        fallbacks: Vec::new,
        post_cook: Some(onix3_post_cook),
    },
    Preset {
        name: "jats",
        description: "JATS journal article XML",
        definition: jats_definition,
        fallbacks: jats_fallbacks,
        post_cook: None,
    },
];

pub fn lookup(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name.trim()))
}

pub fn build(name: &str) -> Result<Schema> {
    lookup(name)
        .ok_or_else(|| ScienceError::Config(format!("unknown schema preset '{name}'")))?
        .build()
}

// ─── Helpers ───────────────────────────────────────────────

fn cook(entries: &[(&str, MetadataField)]) -> Vec<CookEntry> {
    entries
        .iter()
        .map(|(tag, field)| CookEntry {
            tag: tag.to_string(),
            field: *field,
        })
        .collect()
}

fn path(tag: &str, path: &str, evaluator: EvaluatorKind) -> FieldPathConfig {
    FieldPathConfig {
        tag: tag.to_string(),
        path: path.to_string(),
        evaluator,
    }
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

fn fallback(field: MetadataField, list: &[&str]) -> FallbackConfig {
    FallbackConfig {
        field,
        tags: tags(list),
    }
}

// ─── RIS ───────────────────────────────────────────────────

fn ris_definition() -> SchemaDefinition {
    use MetadataField::*;
    SchemaDefinition {
        kind: SchemaKind::Ris,
        article_node: None,
        fields: Vec::new(),
        global_fields: Vec::new(),
        cook: cook(&[
            ("T1", ArticleTitle),
            ("TI", ArticleTitle),
            ("AU", Author),
            ("A1", Author),
            ("DA", Date),
            ("PY", Date),
            ("VL", Volume),
            ("IS", Issue),
            ("SP", StartPage),
            ("EP", EndPage),
            ("DO", Doi),
            ("JO", PublicationTitle),
            ("PB", Publisher),
            ("KW", Keywords),
            ("AB", Abstract),
            ("N2", Abstract),
            ("LA", Language),
        ]),
        dedup_key: None,
        consolidation_key: None,
        filename_key: None,
        type_rule: Some(TypeRuleConfig {
            tag: "TY".to_string(),
            journal: TypeBranchConfig {
                values: tags(&["JOUR", "JFULL", "EJOUR", "MGZN"]),
                publication_title: Some(tags(&["T2", "JO", "JF", "JA"])),
                standard_number: tags(&["SN"]),
                ..Default::default()
            },
            book: TypeBranchConfig {
                values: tags(&["BOOK", "EBOOK", "EDBOOK"]),
                publication_title: Some(tags(&["BT"])),
                series_title: Some(tags(&["T2", "T3"])),
                standard_number: tags(&["SN"]),
                ..Default::default()
            },
            chapter: TypeBranchConfig {
                values: tags(&["CHAP", "ECHAP"]),
                publication_title: Some(tags(&["T2", "BT"])),
                series_title: Some(tags(&["T3"])),
                standard_number: tags(&["SN"]),
                ..Default::default()
            },
        }),
    }
}

fn ris_fallbacks() -> Vec<FallbackConfig> {
    vec![
        fallback(MetadataField::Date, &["Y1"]),
        fallback(MetadataField::ArticleTitle, &["CT"]),
    ]
}

/// Page ranges packed into `SP` and DOIs given only as a resolver URL.
fn ris_post_cook(cooked: &mut CookedRecord, raw: &RawRecord, _: Option<RecordType>) {
    if !cooked.has(MetadataField::EndPage)
        && let Some((start, end)) = cooked
            .get(MetadataField::StartPage)
            .and_then(|sp| sp.split_once('-'))
            .map(|(s, e)| (s.trim().to_string(), e.trim().to_string()))
    {
        cooked.replace(MetadataField::StartPage, start);
        cooked.put(MetadataField::EndPage, end);
    }

    if !cooked.has(MetadataField::Doi)
        && let Some(doi) = raw.get("UR").iter().find_map(|url| crate::identifiers::Doi::parse(url).ok())
    {
        cooked.put(MetadataField::Doi, doi.value);
    }
}

// ─── Highwire meta tags ────────────────────────────────────

fn highwire_definition() -> SchemaDefinition {
    use MetadataField::*;
    SchemaDefinition {
        kind: SchemaKind::MetaTags,
        article_node: None,
        fields: Vec::new(),
        global_fields: Vec::new(),
        cook: cook(&[
            ("citation_title", ArticleTitle),
            ("citation_author", Author),
            ("citation_publication_date", Date),
            ("citation_date", Date),
            ("citation_volume", Volume),
            ("citation_issue", Issue),
            ("citation_firstpage", StartPage),
            ("citation_lastpage", EndPage),
            ("citation_issn", Issn),
            ("citation_isbn", Isbn),
            ("citation_doi", Doi),
            ("citation_journal_title", PublicationTitle),
            ("citation_book_title", PublicationTitle),
            ("citation_publisher", Publisher),
            ("citation_keywords", Keywords),
            ("citation_abstract", Abstract),
            ("citation_language", Language),
            ("citation_pdf_url", AccessUrl),
        ]),
        dedup_key: None,
        consolidation_key: None,
        filename_key: None,
        type_rule: None,
    }
}

fn highwire_fallbacks() -> Vec<FallbackConfig> {
    vec![
        fallback(MetadataField::ArticleTitle, &["dc.title"]),
        fallback(MetadataField::Author, &["dc.creator"]),
        fallback(MetadataField::Date, &["dc.date", "citation_online_date"]),
        fallback(MetadataField::Doi, &["dc.identifier"]),
        fallback(MetadataField::Publisher, &["dc.publisher"]),
        fallback(MetadataField::Language, &["dc.language"]),
    ]
}

// ─── ONIX 3 ────────────────────────────────────────────────

const ONIX_ISBN13: &str = "ProductIdentifier[ProductIDType='15'] | productidentifier[b221='15']";
const ONIX_DOI: &str = "ProductIdentifier[ProductIDType='06'] | productidentifier[b221='06']";
const ONIX_PROPRIETARY: &str =
    "ProductIdentifier[ProductIDType='01'] | productidentifier[b221='01']";
const ONIX_FORM: &str = "DescriptiveDetail/ProductFormDetail | descriptivedetail/b333";
const ONIX_TITLE: &str = "DescriptiveDetail/TitleDetail[TitleType = '01' or TitleType = '1']/TitleElement[TitleElementLevel = '01'] | descriptivedetail/titledetail[b202 = '01' or b202 = '1']/titleelement[x409 = '01']";
const ONIX_CHAPTER_TITLE: &str = "DescriptiveDetail/TitleDetail[TitleType = '01' or TitleType = '1']/TitleElement[TitleElementLevel = '04'] | descriptivedetail/titledetail[b202 = '01' or b202 = '1']/titleelement[x409 = '04']";
const ONIX_CONTRIBUTOR: &str = "DescriptiveDetail/Contributor | descriptivedetail/contributor";
const ONIX_SERIES_TITLE: &str = "DescriptiveDetail/Collection/TitleDetail/TitleElement[TitleElementLevel = '01'] | descriptivedetail/collection/titledetail/titleelement[x409 = '01']";
const ONIX_PUBLISHER: &str =
    "PublishingDetail/Publisher/PublisherName | publishingdetail/publisher/b081";
const ONIX_PUB_DATE: &str = "PublishingDetail/PublishingDate | publishingdetail/publishingdate";
const ONIX_MARKET_DATE: &str = "ProductSupply/MarketPublishingDetail/MarketDate | productsupply/marketpublishingdetail/marketdate";
const ONIX_COPYRIGHT_YEAR: &str =
    "PublishingDetail/CopyrightStatement/CopyrightYear | publishingdetail/copyrightstatement/b087";
const ONIX_LANGUAGE: &str =
    "DescriptiveDetail/Language/LanguageCode | descriptivedetail/language/b252";

fn onix3_definition() -> SchemaDefinition {
    use EvaluatorKind::*;
    SchemaDefinition {
        kind: SchemaKind::Xml,
        article_node: Some("//Product | //product".to_string()),
        fields: vec![
            path("record_reference", "RecordReference | a001", Text),
            path("isbn13", ONIX_ISBN13, IdValue),
            path("doi", ONIX_DOI, IdValue),
            path("proprietary_id", ONIX_PROPRIETARY, IdValue),
            path("product_form", ONIX_FORM, Text),
            path("title", ONIX_TITLE, TitleWithSubtitle),
            path("chapter_title", ONIX_CHAPTER_TITLE, TitleWithSubtitle),
            path("contributor", ONIX_CONTRIBUTOR, PersonName),
            path("series_title", ONIX_SERIES_TITLE, TitleWithSubtitle),
            path("publisher", ONIX_PUBLISHER, Text),
            path("publishing_date", ONIX_PUB_DATE, OnixDate),
            path("market_date", ONIX_MARKET_DATE, OnixDate),
            path("copyright_year", ONIX_COPYRIGHT_YEAR, Text),
            path("language", ONIX_LANGUAGE, Text),
        ],
        global_fields: Vec::new(),
        cook: cook(&[
            ("isbn13", MetadataField::Isbn),
            ("doi", MetadataField::Doi),
            ("title", MetadataField::PublicationTitle),
            ("chapter_title", MetadataField::ArticleTitle),
            ("contributor", MetadataField::Author),
            ("publishing_date", MetadataField::Date),
            ("publisher", MetadataField::Publisher),
            ("series_title", MetadataField::SeriesTitle),
            ("product_form", MetadataField::Format),
            ("language", MetadataField::Language),
            ("proprietary_id", MetadataField::ProprietaryIdentifier),
        ]),
        dedup_key: Some("isbn13".to_string()),
        consolidation_key: Some("product_form".to_string()),
        filename_key: Some("isbn13".to_string()),
        type_rule: None,
    }
}

/// Dates fall back from publishing to market to copyright date. A
/// chapter title makes the record a chapter, otherwise it is a volume.
fn onix3_post_cook(cooked: &mut CookedRecord, raw: &RawRecord, _: Option<RecordType>) {
    use biblion_core::{ArticleType, PublicationType};

    for tag in ["market_date", "copyright_year"] {
        if cooked.has(MetadataField::Date) {
            break;
        }
        for value in raw.get(tag) {
            put_checked(cooked, MetadataField::Date, value);
        }
    }

    cooked.set_publication_type(PublicationType::Book);
    if cooked.has(MetadataField::ArticleTitle) {
        cooked.set_article_type(ArticleType::BookChapter);
    } else {
        cooked.set_article_type(ArticleType::BookVolume);
        if let Some(title) = cooked.get(MetadataField::PublicationTitle).map(str::to_string) {
            cooked.put(MetadataField::ArticleTitle, title);
        }
    }
}

// ─── JATS ──────────────────────────────────────────────────

fn jats_definition() -> SchemaDefinition {
    use EvaluatorKind::*;
    SchemaDefinition {
        kind: SchemaKind::Xml,
        article_node: Some("/article".to_string()),
        fields: vec![
            path("issn_ppub", "front/journal-meta/issn[@pub-type='ppub' or @publication-format='print']", Text),
            path("issn_epub", "front/journal-meta/issn[@pub-type='epub' or @publication-format='electronic']", Text),
            path("journal_title", "front/journal-meta/journal-title-group/journal-title | front/journal-meta/journal-title", Text),
            path("publisher", "front/journal-meta/publisher/publisher-name", Text),
            path("article_title", "front/article-meta/title-group", TitleWithSubtitle),
            path("doi", "front/article-meta/article-id[@pub-id-type='doi']", Text),
            path("volume", "front/article-meta/volume", Text),
            path("issue", "front/article-meta/issue", Text),
            path("fpage", "front/article-meta/fpage", Text),
            path("lpage", "front/article-meta/lpage", Text),
            path("elocation", "front/article-meta/elocation-id", Text),
            path("author", "front/article-meta/contrib-group/contrib[@contrib-type='author']", PersonName),
            path("pub_date", "front/article-meta/pub-date", DateParts),
            path("copyright_year", "front/article-meta/permissions/copyright-year", Text),
            path("keyword", "front/article-meta/kwd-group/kwd", Text),
            path("abstract", "front/article-meta/abstract", Text),
            path("language", "@xml:lang", Attribute),
            path("article_type", "@article-type", Attribute),
        ],
        global_fields: Vec::new(),
        cook: cook(&[
            ("issn_ppub", MetadataField::Issn),
            ("issn_epub", MetadataField::Eissn),
            ("journal_title", MetadataField::PublicationTitle),
            ("publisher", MetadataField::Publisher),
            ("article_title", MetadataField::ArticleTitle),
            ("doi", MetadataField::Doi),
            ("volume", MetadataField::Volume),
            ("issue", MetadataField::Issue),
            ("fpage", MetadataField::StartPage),
            ("lpage", MetadataField::EndPage),
            ("elocation", MetadataField::ItemNumber),
            ("author", MetadataField::Author),
            ("pub_date", MetadataField::Date),
            ("keyword", MetadataField::Keywords),
            ("abstract", MetadataField::Abstract),
            ("language", MetadataField::Language),
        ]),
        dedup_key: None,
        consolidation_key: None,
        filename_key: None,
        type_rule: Some(TypeRuleConfig {
            tag: "article_type".to_string(),
            journal: TypeBranchConfig {
                values: tags(&[
                    "research-article",
                    "review-article",
                    "case-report",
                    "brief-report",
                    "letter",
                    "editorial",
                    "article-commentary",
                ]),
                ..Default::default()
            },
            ..Default::default()
        }),
    }
}

fn jats_fallbacks() -> Vec<FallbackConfig> {
    vec![fallback(MetadataField::Date, &["copyright_year"])]
}
