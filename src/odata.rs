// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

//! OData filter construction. Every externally supplied value placed inside a
//! `$filter` expression must go through [`quote`].

/// Render `value` as an OData string literal, doubling embedded single quotes.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `contains(<property>,'<value>')`
pub fn contains(property: &str, value: &str) -> String {
    format!("contains({},{})", property, quote(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_serial() {
        assert_eq!(
            contains("serialNumber", "ABC123"),
            "contains(serialNumber,'ABC123')"
        );
    }

    #[test]
    fn quote_cannot_close_literal() {
        let filter = contains("serialNumber", "x') or startswith(id,'");
        assert_eq!(
            filter,
            "contains(serialNumber,'x'') or startswith(id,''')"
        );
        // Every quote inside the literal is paired, so the literal ends
        // only at the final character before `)`.
        let inner = &filter["contains(serialNumber,'".len()..filter.len() - 2];
        assert_eq!(inner.replace("''", "").matches('\'').count(), 0);
    }
}
