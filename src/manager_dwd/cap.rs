use std::io::{Cursor, Read};
use roxmltree::{Document, Node};
use zip::ZipArchive;
use crate::manager_dwd::errors::WeatherError;
use crate::manager_dwd::mosmix::decode_text;
use crate::models::weather::Warning;

const WARNING_FILE_PREFIX: &str = "Z_CAP_C_EDZW_";
const WARNING_FILE_SUFFIX: &str = "_PVW_STATUS_PREMIUMD.xml";

fn has_name(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// Text of the first descendant with the given local name, empty if there is none
fn find_text(node: Node, name: &str) -> String {
    node.descendants()
        .find(|n| has_name(n, name))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Parses one CAP document and returns the warnings concerning the given area
///
/// Every area of every info block is checked, an info block that covers several
/// matching areas gives one warning per area.
///
/// # Arguments
///
/// * 'xml' - the CAP document
/// * 'area' - area name, matched case-insensitively as a substring of areaDesc
pub fn parse_warnings(xml: &[u8], area: &str) -> Result<Vec<Warning>, WeatherError> {
    let text = decode_text(xml);
    let doc = Document::parse(&text)?;
    let needle = area.to_lowercase();

    let mut warnings: Vec<Warning> = Vec::new();
    for alert in doc.descendants().filter(|n| has_name(n, "alert")) {
        for info in alert.descendants().filter(|n| has_name(n, "info")) {
            for area_node in info.descendants().filter(|n| has_name(n, "area")) {
                let desc = find_text(area_node, "areaDesc");
                if desc.is_empty() || !desc.to_lowercase().contains(&needle) {
                    continue;
                }

                warnings.push(Warning {
                    area: desc,
                    severity: find_text(info, "severity"),
                    onset: find_text(info, "onset"),
                    expires: find_text(info, "expires"),
                    headline: find_text(info, "headline"),
                    description: find_text(info, "description"),
                });
            }
        }
    }

    Ok(warnings)
}

/// Picks the latest warning document from an HTML directory listing
///
/// Documents are named with a 14 digit timestamp so the greatest name is the latest.
///
/// # Arguments
///
/// * 'listing' - the listing page
pub fn latest_warning_file(listing: &str) -> Option<String> {
    listing
        .split("href=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .filter(|name| is_warning_file(name))
        .max()
        .map(str::to_string)
}

fn is_warning_file(name: &str) -> bool {
    name.strip_prefix(WARNING_FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(WARNING_FILE_SUFFIX))
        .is_some_and(|stamp| stamp.len() == 14 && stamp.bytes().all(|b| b.is_ascii_digit()))
}

/// Parses every CAP document in a zip archive and returns the warnings concerning the given area
///
/// # Arguments
///
/// * 'bytes' - the zip archive
/// * 'area' - area name to match
pub fn warnings_from_archive(bytes: Vec<u8>, area: &str) -> Result<Vec<Warning>, WeatherError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut warnings: Vec<Warning> = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if !file.name().to_lowercase().ends_with(".xml") {
            continue;
        }
        let mut xml = Vec::new();
        file.read_to_end(&mut xml)?;
        warnings.extend(parse_warnings(&xml, area)?);
    }

    Ok(warnings)
}
