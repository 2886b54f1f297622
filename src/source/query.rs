//! Content queries and their URL encoding
//!
//! A query is sent as `GET {endpoint}/documents/search` with the parameters
//! `ref`, `q`, `pageSize`, `page`, `orderings`, `after` and `lang`. Cursor
//! URLs returned by the source use the same encoding, so
//! [`Query::from_url`] can read them back.

use std::fmt;

use url::Url;

use crate::error::BlogError;

/// Default page size of the content API
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Path of the search endpoint relative to the API root
pub const SEARCH_PATH: &str = "documents/search";

/// A document field a predicate or ordering refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    DocumentType,
    DocumentId,
    /// The uid of documents of the given custom type
    Uid(String),
    FirstPublicationDate,
    LastPublicationDate,
}

impl Field {
    fn parse(path: &str) -> Option<Self> {
        match path {
            "document.type" => Some(Self::DocumentType),
            "document.id" => Some(Self::DocumentId),
            "document.first_publication_date" => Some(Self::FirstPublicationDate),
            "document.last_publication_date" => Some(Self::LastPublicationDate),
            other => {
                let doc_type = other.strip_prefix("my.")?.strip_suffix(".uid")?;
                (!doc_type.is_empty()).then(|| Self::Uid(doc_type.to_string()))
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocumentType => f.write_str("document.type"),
            Self::DocumentId => f.write_str("document.id"),
            Self::Uid(doc_type) => write!(f, "my.{doc_type}.uid"),
            Self::FirstPublicationDate => f.write_str("document.first_publication_date"),
            Self::LastPublicationDate => f.write_str("document.last_publication_date"),
        }
    }
}

/// Equality predicate, `[at(field, "value")]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: Field,
    pub value: String,
}

impl Predicate {
    pub fn at(field: Field, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let inner = s.strip_prefix("at(")?.strip_suffix(')')?;
        let (path, value) = inner.split_once(',')?;
        let value = value.trim().strip_prefix('"')?.strip_suffix('"')?;
        Some(Self {
            field: Field::parse(path.trim())?,
            value: value.replace("\\\"", "\""),
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[at({}, \"{}\")]",
            self.field,
            self.value.replace('"', "\\\"")
        )
    }
}

/// Result ordering, `[field]` or `[field desc]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: Field,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: Field) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: Field) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
        let mut parts = inner.split_whitespace();
        let field = Field::parse(parts.next()?)?;
        let descending = match parts.next() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(_) => return None,
        };
        Some(Self { field, descending })
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "[{} desc]", self.field)
        } else {
            write!(f, "[{}]", self.field)
        }
    }
}

/// A document search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub page_size: u32,
    /// 1-based page number
    pub page: u32,
    pub ordering: Option<Ordering>,
    /// Only documents after this document id in the ordering
    pub after: Option<String>,
    pub lang: Option<String>,
    /// Content revision; `None` means the published (master) content
    pub reference: Option<String>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            page: 1,
            ordering: None,
            after: None,
            lang: None,
            reference: None,
        }
    }
}

impl Query {
    /// All documents of a custom type
    pub fn documents_of(doc_type: &str) -> Self {
        Self {
            predicates: vec![Predicate::at(Field::DocumentType, doc_type)],
            ..Self::default()
        }
    }

    /// The document of a custom type with the given uid
    pub fn by_uid(doc_type: &str, uid: &str) -> Self {
        Self {
            predicates: vec![Predicate::at(Field::Uid(doc_type.to_string()), uid)],
            page_size: 1,
            ..Self::default()
        }
    }

    /// The document with the given id
    pub fn by_id(id: &str) -> Self {
        Self {
            predicates: vec![Predicate::at(Field::DocumentId, id)],
            page_size: 1,
            ..Self::default()
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn after(mut self, document_id: impl Into<String>) -> Self {
        self.after = Some(document_id.into());
        self
    }

    pub fn lang(mut self, lang: Option<&str>) -> Self {
        self.lang = lang.map(str::to_string);
        self
    }

    pub fn reference(mut self, reference: Option<&str>) -> Self {
        self.reference = reference.map(str::to_string);
        self
    }

    /// Encoded `q` parameter
    pub fn predicate_expr(&self) -> String {
        let joined: String = self.predicates.iter().map(|p| p.to_string()).collect();
        format!("[{joined}]")
    }

    /// Full search URL below `endpoint`
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let mut url = search_url(endpoint);
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(reference) = &self.reference {
                pairs.append_pair("ref", reference);
            }
            pairs.append_pair("q", &self.predicate_expr());
            pairs.append_pair("pageSize", &self.page_size.to_string());
            pairs.append_pair("page", &self.page.to_string());
            if let Some(ordering) = &self.ordering {
                pairs.append_pair("orderings", &ordering.to_string());
            }
            if let Some(after) = &self.after {
                pairs.append_pair("after", after);
            }
            if let Some(lang) = &self.lang {
                pairs.append_pair("lang", lang);
            }
        }
        url
    }

    /// Read a search URL back into a query
    pub fn from_url(url: &Url) -> Result<Self, BlogError> {
        let invalid = |what: &str| BlogError::InvalidCursor(format!("{what} in {url}"));

        if !url.path().trim_end_matches('/').ends_with(SEARCH_PATH) {
            return Err(invalid("not a search URL"));
        }

        let mut query = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "ref" => query.reference = Some(value.into_owned()),
                "q" => query.predicates = parse_predicates(&value).ok_or_else(|| invalid("bad q"))?,
                "pageSize" => {
                    query.page_size = value.parse().map_err(|_| invalid("bad pageSize"))?
                }
                "page" => query.page = value.parse().map_err(|_| invalid("bad page"))?,
                "orderings" => {
                    query.ordering =
                        Some(Ordering::parse(&value).ok_or_else(|| invalid("bad orderings"))?)
                }
                "after" => query.after = Some(value.into_owned()),
                "lang" => query.lang = Some(value.into_owned()),
                _ => {}
            }
        }

        let (size, page) = (query.page_size, query.page);
        Ok(query.page_size(size).page(page))
    }
}

/// `{endpoint}/documents/search` without a query string
pub fn search_url(endpoint: &Url) -> Url {
    let mut url = endpoint.clone();
    url.set_query(None);
    let path = format!("{}/{}", url.path().trim_end_matches('/'), SEARCH_PATH);
    url.set_path(&path);
    url
}

/// Whether `url` is served by the same origin and API root as `endpoint`
pub fn belongs_to(url: &Url, endpoint: &Url) -> bool {
    url.scheme() == endpoint.scheme()
        && url.host_str() == endpoint.host_str()
        && url.port_or_known_default() == endpoint.port_or_known_default()
        && url.path().starts_with(endpoint.path().trim_end_matches('/'))
}

fn parse_predicates(q: &str) -> Option<Vec<Predicate>> {
    let inner = q.trim().strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return Some(Vec::new());
    }
    let inner = inner.strip_prefix('[')?.strip_suffix(']')?;
    inner.split("][").map(Predicate::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://blog.cdn.prismic.io/api/v2").unwrap()
    }

    #[test]
    fn test_predicate_display() {
        let p = Predicate::at(Field::DocumentType, "posts");
        assert_eq!(p.to_string(), r#"[at(document.type, "posts")]"#);
        let p = Predicate::at(Field::Uid("posts".to_string()), "hello");
        assert_eq!(p.to_string(), r#"[at(my.posts.uid, "hello")]"#);
    }

    #[test]
    fn test_ordering_display() {
        assert_eq!(
            Ordering::desc(Field::LastPublicationDate).to_string(),
            "[document.last_publication_date desc]"
        );
        assert_eq!(
            Ordering::asc(Field::FirstPublicationDate).to_string(),
            "[document.first_publication_date]"
        );
    }

    #[test]
    fn test_to_url() {
        let url = Query::documents_of("posts")
            .page_size(1)
            .ordering(Ordering::desc(Field::LastPublicationDate))
            .reference(Some("MASTER"))
            .to_url(&endpoint());

        assert_eq!(url.path(), "/api/v2/documents/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("ref".to_string(), "MASTER".to_string())));
        assert!(pairs.contains(&("q".to_string(), r#"[[at(document.type, "posts")]]"#.to_string())));
        assert!(pairs.contains(&("pageSize".to_string(), "1".to_string())));
        assert!(pairs.contains(&(
            "orderings".to_string(),
            "[document.last_publication_date desc]".to_string()
        )));
    }

    #[test]
    fn test_url_round_trip_with_every_parameter() {
        let query = Query {
            predicates: vec![
                Predicate::at(Field::DocumentType, "posts"),
                Predicate::at(Field::Uid("posts".to_string()), "a \"quoted\" uid"),
            ],
            page_size: 5,
            page: 3,
            ordering: Some(Ordering::asc(Field::FirstPublicationDate)),
            after: Some("YF0rdBIAACYAl3h5".to_string()),
            lang: Some("pt-br".to_string()),
            reference: Some("PREVIEW".to_string()),
        };
        let parsed = Query::from_url(&query.to_url(&endpoint())).unwrap();
        assert_eq!(parsed, query);
    }

    #[test]
    fn test_from_url_reads_source_cursor() {
        let url = Url::parse(
            "https://blog.cdn.prismic.io/api/v2/documents/search?ref=YF&q=%5B%5Bat%28document.type%2C+%22posts%22%29%5D%5D&page=2&pageSize=1",
        )
        .unwrap();
        let query = Query::from_url(&url).unwrap();
        assert_eq!(query.page, 2);
        assert_eq!(query.page_size, 1);
        assert_eq!(query.reference.as_deref(), Some("YF"));
        assert_eq!(query.predicates, vec![Predicate::at(Field::DocumentType, "posts")]);
    }

    #[test]
    fn test_from_url_rejects_other_paths() {
        let url = Url::parse("https://blog.cdn.prismic.io/api/v2?page=2").unwrap();
        assert!(matches!(
            Query::from_url(&url),
            Err(BlogError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_from_url_rejects_bad_numbers() {
        let url =
            Url::parse("https://blog.cdn.prismic.io/api/v2/documents/search?page=two").unwrap();
        assert!(Query::from_url(&url).is_err());
    }

    #[test]
    fn test_from_url_clamps_zero_page_and_size() {
        let url = Url::parse(
            "https://blog.cdn.prismic.io/api/v2/documents/search?page=0&pageSize=0",
        )
        .unwrap();
        let query = Query::from_url(&url).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 1);
    }

    #[test]
    fn test_belongs_to() {
        let ep = endpoint();
        let ok = Url::parse("https://blog.cdn.prismic.io/api/v2/documents/search?page=2").unwrap();
        let other_host = Url::parse("https://evil.example/api/v2/documents/search").unwrap();
        let other_path = Url::parse("https://blog.cdn.prismic.io/admin").unwrap();
        let http = Url::parse("http://blog.cdn.prismic.io/api/v2/documents/search").unwrap();
        assert!(belongs_to(&ok, &ep));
        assert!(!belongs_to(&other_host, &ep));
        assert!(!belongs_to(&other_path, &ep));
        assert!(!belongs_to(&http, &ep));
    }

    #[test]
    fn test_search_url_with_trailing_slash() {
        let ep = Url::parse("https://blog.cdn.prismic.io/api/v2/").unwrap();
        assert_eq!(
            search_url(&ep).as_str(),
            "https://blog.cdn.prismic.io/api/v2/documents/search"
        );
    }
}
