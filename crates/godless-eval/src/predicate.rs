use std::collections::BTreeSet;

use godless_core::{Row, RowName};
use godless_query::{PredicateOpCode, QueryValue, QueryWhere};

/// Does `where_tree` match `row` (named `row_key`)?
///
/// `And`/`Or` recurse structurally. A predicate first projects each
/// operand to the set of strings it could mean for this row
/// (`QueryValue::Key` projects to every point text on that entry — an
/// entry can carry more than one point — `RowKey` to the row's own name,
/// `Literal` to itself). `str_eq` holds iff some value is common to every
/// operand's set (the sets' intersection is non-empty); `str_neq` holds
/// iff no value is shared between any two operands' sets (the sets are
/// pairwise disjoint) — the exact negation of `str_eq`, not an existential
/// "some distinct assignment exists" reading. With exactly one value per
/// operand (the common case) both collapse to ordinary equality/
/// inequality.
pub fn where_matches(where_tree: &QueryWhere, row_key: &RowName, row: &Row) -> bool {
    match where_tree {
        QueryWhere::And(clauses) => clauses.iter().all(|c| where_matches(c, row_key, row)),
        QueryWhere::Or(clauses) => clauses.iter().any(|c| where_matches(c, row_key, row)),
        QueryWhere::Predicate(predicate) => {
            let value_sets: Vec<Vec<String>> = predicate
                .values
                .iter()
                .map(|value| project(value, row_key, row))
                .collect();
            predicate_holds(predicate.op_code, &value_sets)
        }
    }
}

fn project(value: &QueryValue, row_key: &RowName, row: &Row) -> Vec<String> {
    match value {
        QueryValue::Literal(text) => vec![text.clone()],
        QueryValue::RowKey => vec![row_key.0.clone()],
        QueryValue::Key(entry_name) => row
            .get(entry_name)
            .map(|entry| entry.values().map(|p| p.text().0.clone()).collect())
            .unwrap_or_default(),
    }
}

fn predicate_holds(op_code: PredicateOpCode, value_sets: &[Vec<String>]) -> bool {
    if value_sets.iter().any(Vec::is_empty) {
        return false;
    }

    match op_code {
        PredicateOpCode::StrEq => {
            let mut common: BTreeSet<&String> = value_sets[0].iter().collect();
            for set in &value_sets[1..] {
                let set: BTreeSet<&String> = set.iter().collect();
                common = common.intersection(&set).copied().collect();
                if common.is_empty() {
                    return false;
                }
            }
            !common.is_empty()
        }
        PredicateOpCode::StrNeq => pairwise_disjoint(value_sets),
    }
}

/// True iff no value appears in two different operands' projected sets —
/// every pair of value-sets is disjoint. This is the exact negation of
/// `str_eq`'s intersection test, not "some assignment of distinct values
/// exists"; a row whose entry merely *contains* the literal being
/// compared against must not match, even if the entry also carries other
/// values that would be distinct from it.
fn pairwise_disjoint(value_sets: &[Vec<String>]) -> bool {
    for i in 0..value_sets.len() {
        let a: BTreeSet<&String> = value_sets[i].iter().collect();
        for set in &value_sets[i + 1..] {
            let b: BTreeSet<&String> = set.iter().collect();
            if a.intersection(&b).next().is_some() {
                return false;
            }
        }
    }
    true
}
