use crate::reference::ReferenceTable;
use crate::types::{CanonicalAllelePair, Match};

/// Column holding the rsid
const RSID_COLUMN: usize = 0;
/// Columns holding the two allele calls (rsid, chromosome, position, allele1, allele2)
const ALLELE1_COLUMN: usize = 3;

/// Match one raw genotype line against the reference table.
///
/// Comment lines, blank lines, lines with fewer than five columns, blank allele
/// calls and genotypes without an annotation all yield `None`.
pub fn match_line(line: &str, table: &ReferenceTable) -> Option<Match> {
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split('\t');
    let rsid = fields.nth(RSID_COLUMN)?;
    let allele1 = fields.nth(ALLELE1_COLUMN - RSID_COLUMN - 1)?;
    let allele2 = fields.next()?;

    let pair = CanonicalAllelePair::new(allele1, allele2)?;
    let entry = table.lookup(rsid, &pair)?;
    Some(Match::new(rsid, &pair, entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReferenceEntry, Repute};

    fn table() -> ReferenceTable {
        let mut table = ReferenceTable::new();
        table.insert(
            "rs123",
            &CanonicalAllelePair::new("A", "G").unwrap(),
            ReferenceEntry {
                gene: "X".to_string(),
                summary: "s".to_string(),
                magnitude: 2.0,
                repute: Repute::Good,
            },
        );
        table
    }

    #[test]
    fn test_match_scenario() {
        let m = match_line("rs123\tchr1\t100\ta\tg", &table()).unwrap();
        assert_eq!(m.key, "rs123(A;G)");
        assert_eq!(m.gene, "X");
        assert_eq!(m.summary, "s");
        assert_eq!(m.magnitude, 2.0);
        assert_eq!(m.repute, Repute::Good);
    }

    #[test]
    fn test_allele_order_is_irrelevant() {
        let table = table();
        let ag = match_line("rs123\t1\t100\tA\tG", &table);
        let ga = match_line("rs123\t1\t100\tG\tA", &table);
        assert!(ag.is_some());
        assert_eq!(ag, ga);
    }

    #[test]
    fn test_extra_columns_and_carriage_return() {
        let table = table();
        assert!(match_line("rs123\t1\t100\tG\tA\textra", &table).is_some());
        assert!(match_line("rs123\t1\t100\tG\tA\r", &table).is_some());
    }

    #[test]
    fn test_skipped_lines() {
        let table = table();
        for line in [
            "",
            "#rsid\tchromosome\tposition\tallele1\tallele2",
            "# rs123\t1\t100\tA\tG",
            "rs123\t1\t100\tA",
            "rs123\t1\t100\tAG",
            "rs123\t1\t100\t\tG",
            "rs123\t1\t100\tA\t ",
            "rs123\t1\t100\tG\tG",
            "rs123\t1\t100\t0\t0",
            "rs999\t1\t100\tA\tG",
            "rs123 1 100 A G",
        ] {
            assert!(match_line(line, &table).is_none(), "{line:?}");
        }
    }
}
