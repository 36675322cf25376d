//! Airport and country code lookups
//!
//! Static tables only; no I/O. Unmatched country names are a data-quality
//! signal and are logged, never raised.

use tracing::warn;

/// Fallback for unknown airports
pub const DEFAULT_COUNTRY: &str = "US";

/// Fallback for unknown country names
pub const DEFAULT_ISO: &str = "us";

/// ISO-3166 alpha-2 country (upper-case) of an IATA airport code
///
/// The lookup is case-insensitive; unknown codes resolve to [`DEFAULT_COUNTRY`].
pub fn resolve_country(iata_code: &str) -> &'static str {
    match iata_code.trim().to_ascii_uppercase().as_str() {
        // India
        "DEL" | "BOM" | "MAA" | "BLR" | "CCU" | "HYD" | "COK" | "GOI" | "GOX" | "AMD" | "PNQ"
        | "JAI" | "TRV" | "IXZ" | "IXL" | "SXR" | "ATQ" | "LKO" | "GAU" | "IXB" | "IXC" | "IXE"
        | "IXM" | "BBI" | "PAT" | "VNS" | "UDR" | "JDH" | "CJB" | "VTZ" | "NAG" | "IDR" | "BHO"
        | "IXR" | "DED" | "IXJ" | "TRZ" | "IXA" | "IMF" | "AGR" => "IN",
        // United States
        "JFK" | "EWR" | "LGA" | "LAX" | "SFO" | "ORD" | "ATL" | "DFW" | "SEA" | "BOS" | "MIA"
        | "IAD" | "IAH" | "LAS" | "DEN" | "HNL" | "MCO" | "PHX" => "US",
        "YYZ" | "YVR" | "YUL" | "YYC" => "CA",
        "MEX" | "CUN" => "MX",
        "GRU" | "GIG" => "BR",
        "EZE" => "AR",
        // Europe
        "LHR" | "LGW" | "MAN" | "EDI" | "STN" => "GB",
        "CDG" | "ORY" | "NCE" => "FR",
        "FRA" | "MUC" | "BER" | "DUS" | "HAM" => "DE",
        "AMS" => "NL",
        "MAD" | "BCN" => "ES",
        "FCO" | "MXP" | "VCE" => "IT",
        "ZRH" | "GVA" => "CH",
        "VIE" => "AT",
        "LIS" | "OPO" => "PT",
        "ATH" | "JTR" => "GR",
        "IST" | "SAW" => "TR",
        "CPH" => "DK",
        "DUB" => "IE",
        "PRG" => "CZ",
        // Middle East and Africa
        "DXB" | "AUH" | "SHJ" => "AE",
        "DOH" => "QA",
        "MCT" => "OM",
        "BAH" => "BH",
        "RUH" | "JED" => "SA",
        "CAI" => "EG",
        "JNB" | "CPT" => "ZA",
        "NBO" => "KE",
        "MRU" => "MU",
        // Asia Pacific
        "SIN" => "SG",
        "BKK" | "DMK" | "HKT" | "CNX" => "TH",
        "KUL" | "PEN" => "MY",
        "CGK" | "DPS" => "ID",
        "MNL" | "CEB" => "PH",
        "HKG" => "HK",
        "NRT" | "HND" | "KIX" => "JP",
        "ICN" | "GMP" => "KR",
        "PEK" | "PKX" | "PVG" | "CAN" => "CN",
        "TPE" => "TW",
        "SGN" | "HAN" | "DAD" => "VN",
        "CMB" => "LK",
        "KTM" => "NP",
        "MLE" => "MV",
        "DAC" => "BD",
        "PBH" => "BT",
        "SYD" | "MEL" | "BNE" | "PER" => "AU",
        "AKL" | "CHC" | "ZQN" => "NZ",
        _ => DEFAULT_COUNTRY,
    }
}

/// ISO-3166 alpha-2 code (lower-case) of a country name
///
/// Exact, case-sensitive match. Unknown names log a warning and resolve to
/// [`DEFAULT_ISO`].
pub fn resolve_iso(country_name: &str) -> &'static str {
    match country_name {
        "India" => "in",
        "United States" | "United States of America" | "USA" => "us",
        "Canada" => "ca",
        "Mexico" => "mx",
        "Brazil" => "br",
        "Argentina" => "ar",
        "United Kingdom" | "UK" | "England" | "Scotland" => "gb",
        "France" => "fr",
        "Germany" => "de",
        "Netherlands" => "nl",
        "Spain" => "es",
        "Italy" => "it",
        "Switzerland" => "ch",
        "Austria" => "at",
        "Portugal" => "pt",
        "Greece" => "gr",
        "Turkey" | "Türkiye" => "tr",
        "Denmark" => "dk",
        "Ireland" => "ie",
        "Czech Republic" | "Czechia" => "cz",
        "United Arab Emirates" | "UAE" => "ae",
        "Qatar" => "qa",
        "Oman" => "om",
        "Bahrain" => "bh",
        "Saudi Arabia" => "sa",
        "Egypt" => "eg",
        "South Africa" => "za",
        "Kenya" => "ke",
        "Mauritius" => "mu",
        "Singapore" => "sg",
        "Thailand" => "th",
        "Malaysia" => "my",
        "Indonesia" => "id",
        "Philippines" => "ph",
        "Hong Kong" => "hk",
        "Japan" => "jp",
        "South Korea" | "Korea" => "kr",
        "China" => "cn",
        "Taiwan" => "tw",
        "Vietnam" => "vn",
        "Sri Lanka" => "lk",
        "Nepal" => "np",
        "Maldives" => "mv",
        "Bangladesh" => "bd",
        "Bhutan" => "bt",
        "Australia" => "au",
        "New Zealand" => "nz",
        _ => {
            warn!(country = country_name, "Unmatched country name, using default region");
            DEFAULT_ISO
        }
    }
}

/// Geocoding region bias for a destination such as `"Leh, Ladakh, India"`
///
/// Uses the last comma-separated segment as the country name.
pub fn region_for_destination(destination: &str) -> &'static str {
    let country = destination.rsplit(',').next().unwrap_or(destination).trim();
    resolve_iso(country)
}
