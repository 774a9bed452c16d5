use smallvec::SmallVec;
use tempora_types::{cmp_opt, Document, Value};

// ----------------------------------------------------------------------------

/// A predicate over document fields.
///
/// Mirrors the subset of aggregation matching the store relies on: equality,
/// membership, ordered comparison, and conjunction. A missing field matches
/// nothing.
#[derive(Clone, Debug)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    Lte(String, Value),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In(field.into(), values)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte(field.into(), value.into())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Eq(field, value) => doc
                .get(field)
                .is_some_and(|held| held.total_cmp(value).is_eq()),
            Self::In(field, values) => doc.get(field).is_some_and(|held| {
                values.iter().any(|value| held.total_cmp(value).is_eq())
            }),
            Self::Lte(field, value) => doc
                .get(field)
                .is_some_and(|held| held.total_cmp(value).is_le()),
            Self::And(filters) => filters.iter().all(|filter| filter.matches(doc)),
        }
    }
}

/// Sort direction of one sort field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One aggregation stage.
#[derive(Clone, Debug)]
pub enum Stage {
    Match(Filter),
    /// Stable multi-field sort; missing fields sort first.
    Sort(SmallVec<[(String, SortOrder); 4]>),
    Limit(usize),
    /// Keep only the listed fields.
    Project(Vec<String>),
}

// ----------------------------------------------------------------------------

/// An ordered list of stages, built by value: every builder method returns
/// the extended pipeline.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_stage(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn sort_stage(mut self, fields: &[(&str, SortOrder)]) -> Self {
        self.stages.push(Stage::Sort(
            fields
                .iter()
                .map(|(field, order)| ((*field).to_owned(), *order))
                .collect(),
        ));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.stages.push(Stage::Limit(limit));
        self
    }

    pub fn project(mut self, fields: &[&str]) -> Self {
        self.stages
            .push(Stage::Project(fields.iter().map(|f| (*f).to_owned()).collect()));
        self
    }

    pub fn has_sort(&self) -> bool {
        self.stages
            .iter()
            .any(|stage| matches!(stage, Stage::Sort(_)))
    }

    /// Append a field to the existing sort stage, or start one.
    ///
    /// Later fields are secondary: a second `sort_by` refines the first
    /// rather than replacing it.
    pub fn merge_sort_field(mut self, field: &str, order: SortOrder) -> Self {
        for stage in self.stages.iter_mut().rev() {
            if let Stage::Sort(fields) = stage {
                fields.push((field.to_owned(), order));
                return self;
            }
        }
        self.stages
            .push(Stage::Sort(smallvec::smallvec![(field.to_owned(), order)]));
        self
    }

    /// Evaluate over a snapshot of documents in primary-key order.
    ///
    /// Leading match stages filter before anything is cloned; the remaining
    /// stages transform the materialized batch.
    pub fn run<'a>(&self, rows: impl Iterator<Item = &'a Document>) -> Vec<Document> {
        let mut stages = self.stages.as_slice();

        let mut leading: Vec<&Filter> = Vec::new();
        while let Some(Stage::Match(filter)) = stages.first() {
            leading.push(filter);
            stages = &stages[1..];
        }

        let mut docs: Vec<Document> = rows
            .filter(|doc| leading.iter().all(|filter| filter.matches(doc)))
            .cloned()
            .collect();

        for stage in stages {
            match stage {
                Stage::Match(filter) => docs.retain(|doc| filter.matches(doc)),
                Stage::Sort(fields) => {
                    docs.sort_by(|a, b| {
                        for (field, order) in fields {
                            let ordering = cmp_opt(a.get(field), b.get(field));
                            let ordering = match order {
                                SortOrder::Ascending => ordering,
                                SortOrder::Descending => ordering.reverse(),
                            };
                            if !ordering.is_eq() {
                                return ordering;
                            }
                        }
                        std::cmp::Ordering::Equal
                    });
                }
                Stage::Limit(limit) => docs.truncate(*limit),
                Stage::Project(fields) => {
                    docs = docs
                        .into_iter()
                        .map(|doc| {
                            let mut projected = Document::new();
                            for field in fields {
                                if let Some(value) = doc.get(field) {
                                    projected.set(field.clone(), value.clone());
                                }
                            }
                            projected
                        })
                        .collect();
                }
            }
        }

        docs
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, name: &str, version: i64) -> Document {
        let mut doc = Document::new();
        doc.set("Id", id);
        doc.set("Name", name);
        doc.set("Version", version);
        doc
    }

    fn rows() -> Vec<Document> {
        vec![
            doc(1, "B", 0),
            doc(2, "A", 1),
            doc(3, "A", 0),
            doc(4, "C", 2),
        ]
    }

    #[test]
    fn match_filters() {
        let rows = rows();
        let pipe = Pipeline::new().match_stage(Filter::eq("Name", "A"));
        let out = pipe.run(rows.iter());
        assert_eq!(out.len(), 2);

        let pipe = Pipeline::new().match_stage(Filter::lte("Id", 2_i64));
        assert_eq!(pipe.run(rows.iter()).len(), 2);

        let pipe = Pipeline::new().match_stage(Filter::is_in(
            "Name",
            vec![Value::from("A"), Value::from("C")],
        ));
        assert_eq!(pipe.run(rows.iter()).len(), 3);
    }

    #[test]
    fn missing_fields_do_not_match() {
        let rows = rows();
        let pipe = Pipeline::new().match_stage(Filter::eq("Absent", 1_i64));
        assert!(pipe.run(rows.iter()).is_empty());
    }

    #[test]
    fn sort_is_stable_and_multi_field() {
        let rows = rows();
        let pipe = Pipeline::new().sort_stage(&[
            ("Name", SortOrder::Ascending),
            ("Version", SortOrder::Descending),
        ]);
        let out = pipe.run(rows.iter());
        let ids: Vec<i64> = out.iter().map(|d| d.get("Id").unwrap().as_int().unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 1, 4]);
    }

    #[test]
    fn merge_sort_appends_secondary_field() {
        let rows = rows();
        let pipe = Pipeline::new()
            .merge_sort_field("Name", SortOrder::Ascending)
            .merge_sort_field("Version", SortOrder::Ascending);
        let out = pipe.run(rows.iter());
        let ids: Vec<i64> = out.iter().map(|d| d.get("Id").unwrap().as_int().unwrap()).collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
    }

    #[test]
    fn limit_and_project() {
        let rows = rows();
        let pipe = Pipeline::new()
            .sort_stage(&[("Id", SortOrder::Descending)])
            .limit(2)
            .project(&["Id"]);
        let out = pipe.run(rows.iter());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("Id").unwrap().as_int(), Some(4));
        assert!(out[0].get("Name").is_none());
    }
}
