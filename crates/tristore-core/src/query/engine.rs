//! Pattern queries: pick a strategy, scan its range, decode and re-check rows.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::{EncodedRow, RowComponents, TableLayout, TripleCodec};
use crate::error::Error;
use crate::iter::CloseableIterator;
use crate::model::{Iri, PatternTerm, Quad, TriplePattern, Value};
use crate::storage::{RowScan, StorageConfig, TableStore};
use crate::strategy::{ByteRange, RowRegex, TriplePatternStrategy};

/// How a pattern will be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    /// The strategy serving the pattern, or `None` for a full-table fallback.
    pub strategy: Option<TriplePatternStrategy>,
    pub layout: TableLayout,
    pub range: ByteRange,
}

impl ScanPlan {
    pub fn is_full_scan(&self) -> bool {
        self.strategy.is_none()
    }
}

/// Read side of the index.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn TableStore>,
    codec: Arc<TripleCodec>,
    tables: [String; 3],
    hashed: bool,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn TableStore>,
        codec: Arc<TripleCodec>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            store,
            codec,
            tables: TableLayout::ALL.map(|layout| config.table_name(layout)),
            hashed: config.hashed_layouts,
        }
    }

    pub fn codec(&self) -> &Arc<TripleCodec> {
        &self.codec
    }

    pub fn is_hashed(&self) -> bool {
        self.hashed
    }

    /// Table holding rows of a layout.
    pub fn table(&self, layout: TableLayout) -> &str {
        match layout {
            TableLayout::Spo => &self.tables[0],
            TableLayout::Po => &self.tables[1],
            TableLayout::Osp => &self.tables[2],
        }
    }

    /// Strategies for this store's mode, in selection order.
    pub fn strategies(&self) -> [TriplePatternStrategy; 3] {
        TriplePatternStrategy::for_mode(self.hashed)
    }

    /// First strategy that handles the pattern.
    pub fn select_strategy(&self, pattern: &TriplePattern) -> Option<TriplePatternStrategy> {
        self.strategies().into_iter().find(|strategy| strategy.handles(pattern))
    }

    /// Layout and range of a pattern some strategy handles.
    pub fn range_for(&self, pattern: &TriplePattern) -> Result<(TableLayout, ByteRange), Error> {
        let strategy = self.select_strategy(pattern).ok_or(Error::UnsupportedPattern)?;
        strategy
            .define_range(&self.codec, pattern)?
            .ok_or(Error::UnsupportedPattern)
    }

    /// Plan a pattern, falling back to a full SPO scan when no strategy applies.
    pub fn plan_scan(&self, pattern: &TriplePattern) -> Result<ScanPlan, Error> {
        match self.select_strategy(pattern) {
            Some(strategy) => {
                let (layout, range) = strategy
                    .define_range(&self.codec, pattern)?
                    .ok_or(Error::UnsupportedPattern)?;
                debug!(?strategy, ?range, "Planned range scan");
                Ok(ScanPlan {
                    strategy: Some(strategy),
                    layout,
                    range,
                })
            }
            None => {
                if !pattern.is_unbound() {
                    warn!(?pattern, "No strategy handles pattern, scanning full SPO table");
                }
                Ok(ScanPlan {
                    strategy: None,
                    layout: TableLayout::Spo,
                    range: ByteRange::full(),
                })
            }
        }
    }

    /// All quads matching the pattern.
    pub fn query(&self, pattern: &TriplePattern) -> Result<QuadScan, Error> {
        self.open(pattern, None)
    }

    /// Quads matching the pattern whose storage keys also match `regex`.
    ///
    /// The regex must target the layout and hash mode this pattern is planned
    /// on; [`QueryEngine::build_regex`] builds one that does.
    pub fn query_with_regex(
        &self,
        pattern: &TriplePattern,
        regex: &RowRegex,
    ) -> Result<QuadScan, Error> {
        self.open(pattern, Some(regex))
    }

    /// Build a key regex for the table `pattern` will be scanned on.
    ///
    /// Arguments are as for [`TriplePatternStrategy::build_regex`]. Patterns no
    /// strategy handles get a regex over the full-scan SPO table.
    pub fn build_regex(
        &self,
        pattern: &TriplePattern,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
        context: Option<&str>,
        object_marker: Option<u8>,
    ) -> Option<RowRegex> {
        self.select_strategy(pattern)
            .unwrap_or_else(|| TriplePatternStrategy::new(TableLayout::Spo, self.hashed))
            .build_regex(subject, predicate, object, context, object_marker)
    }

    /// Whether at least one quad matches the pattern.
    pub fn contains_match(&self, pattern: &TriplePattern) -> Result<bool, Error> {
        let mut scan = self.query(pattern)?;
        let found = match scan.next() {
            Some(Ok(_)) => true,
            None => false,
            Some(Err(err)) => {
                let _ = scan.close();
                return Err(err);
            }
        };
        scan.close()?;
        Ok(found)
    }

    fn open(&self, pattern: &TriplePattern, regex: Option<&RowRegex>) -> Result<QuadScan, Error> {
        let plan = self.plan_scan(pattern)?;
        if let Some(regex) = regex {
            if regex.layout() != plan.layout || regex.is_hashed() != self.hashed {
                return Err(Error::MismatchedRegex {
                    expected: describe(plan.layout, self.hashed),
                    found: describe(regex.layout(), regex.is_hashed()),
                });
            }
        }
        let residual = Residual::new(&self.codec, pattern)?;
        let rows = self.store.scan(self.table(plan.layout), &plan.range, regex)?;
        Ok(QuadScan {
            rows,
            codec: self.codec.clone(),
            layout: plan.layout,
            hashed: self.hashed,
            residual,
            closed: false,
        })
    }
}

fn describe(layout: TableLayout, hashed: bool) -> String {
    if hashed {
        format!("hashed {}", layout)
    } else {
        layout.to_string()
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("tables", &self.tables)
            .field("hashed", &self.hashed)
            .finish()
    }
}

/// Decoded quads of one pattern scan.
pub struct QuadScan {
    rows: RowScan,
    codec: Arc<TripleCodec>,
    layout: TableLayout,
    hashed: bool,
    residual: Residual,
    closed: bool,
}

impl QuadScan {
    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    fn accept(&self, key: &[u8], value: &[u8]) -> Result<Option<Quad>, Error> {
        let cell = EncodedRow::from_storage(key, value)?;
        let parts = self.codec.split_row(self.layout, self.hashed, &cell.row)?;
        if !self.residual.matches(&parts, &cell.column_family) {
            return Ok(None);
        }
        self.codec.decode(self.layout, self.hashed, &cell).map(Some)
    }
}

impl Iterator for QuadScan {
    type Item = Result<Quad, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        loop {
            let (key, value) = match self.rows.next()? {
                Ok(kv) => kv,
                Err(err) => return Some(Err(err)),
            };
            match self.accept(&key, &value) {
                Ok(Some(quad)) => return Some(Ok(quad)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl CloseableIterator for QuadScan {
    fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.rows.close()
    }
}

/// A pattern term compared against encoded component bytes.
#[derive(Debug, Clone)]
enum TermCheck {
    Any,
    Equals(Vec<u8>),
    Within(Vec<u8>, Vec<u8>),
}

impl TermCheck {
    fn matches(&self, bytes: &[u8]) -> bool {
        match self {
            TermCheck::Any => true,
            TermCheck::Equals(expected) => bytes == expected.as_slice(),
            TermCheck::Within(start, end) => bytes >= start.as_slice() && bytes < end.as_slice(),
        }
    }

    fn from_iri(codec: &TripleCodec, term: &PatternTerm<Iri>) -> Result<Self, Error> {
        Ok(match term {
            PatternTerm::Unbound => TermCheck::Any,
            PatternTerm::Constant(iri) => TermCheck::Equals(codec.encode_iri(iri)?),
            PatternTerm::Range(range) => {
                TermCheck::Within(codec.encode_iri(&range.start)?, codec.encode_iri(&range.end)?)
            }
        })
    }

    fn from_value(codec: &TripleCodec, term: &PatternTerm<Value>) -> Result<Self, Error> {
        Ok(match term {
            PatternTerm::Unbound => TermCheck::Any,
            PatternTerm::Constant(value) => TermCheck::Equals(codec.encode_value(value)?),
            PatternTerm::Range(range) => TermCheck::Within(
                codec.encode_value(&range.start)?,
                codec.encode_value(&range.end)?,
            ),
        })
    }
}

/// Re-checks every scanned row against the full pattern.
///
/// Scan ranges cover only the bound prefix of a layout, and context is never
/// part of a range.
#[derive(Debug, Clone)]
struct Residual {
    subject: TermCheck,
    predicate: TermCheck,
    object: TermCheck,
    context: TermCheck,
}

impl Residual {
    fn new(codec: &TripleCodec, pattern: &TriplePattern) -> Result<Self, Error> {
        Ok(Self {
            subject: TermCheck::from_iri(codec, &pattern.subject)?,
            predicate: TermCheck::from_iri(codec, &pattern.predicate)?,
            object: TermCheck::from_value(codec, &pattern.object)?,
            context: TermCheck::from_iri(codec, &pattern.context)?,
        })
    }

    fn matches(&self, parts: &RowComponents<'_>, column_family: &[u8]) -> bool {
        self.subject.matches(parts.subject)
            && self.predicate.matches(parts.predicate)
            && self.object.matches(parts.object)
            && self.context.matches(column_family)
    }
}
