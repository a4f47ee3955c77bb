//! Static catalogue of screener industry filters.
//!
//! The display names are surfaced to the AI prompts (so analysis output stays
//! compatible with the screener) and the ids are the values the screener URL
//! accepts. Loaded once, immutable for the process lifetime.

use std::sync::OnceLock;

/// Screener filter id for the industry category
pub const INDUSTRY_FILTER_ID: &str = "ind";

pub const INDUSTRY_FILTER_TITLE: &str = "Industry";

pub const INDUSTRY_FILTER_DESCRIPTION: &str = "The industry which a stock belongs to.";

/// (filter value, display name) pairs
pub const INDUSTRIES: &[(&str, &str)] = &[
    ("ind_stocksonly", "Stocks only (ex-Funds)"),
    ("ind_exchangetradedfund", "Exchange Traded Fund"),
    ("ind_advertisingagencies", "Advertising Agencies"),
    ("ind_aerospacedefense", "Aerospace & Defense"),
    ("ind_agriculturalinputs", "Agricultural Inputs"),
    ("ind_airlines", "Airlines"),
    ("ind_airportsairservices", "Airports & Air Services"),
    ("ind_aluminum", "Aluminum"),
    ("ind_apparelmanufacturing", "Apparel Manufacturing"),
    ("ind_apparelretail", "Apparel Retail"),
    ("ind_assetmanagement", "Asset Management"),
    ("ind_automanufacturers", "Auto Manufacturers"),
    ("ind_autoparts", "Auto Parts"),
    ("ind_autotruckdealerships", "Auto & Truck Dealerships"),
    ("ind_banksdiversified", "Banks - Diversified"),
    ("ind_banksregional", "Banks - Regional"),
    ("ind_beveragesbrewers", "Beverages - Brewers"),
    ("ind_beveragesnonalcoholic", "Beverages - Non-Alcoholic"),
    ("ind_beverageswineriesdistilleries", "Beverages - Wineries & Distilleries"),
    ("ind_biotechnology", "Biotechnology"),
    ("ind_broadcasting", "Broadcasting"),
    ("ind_buildingmaterials", "Building Materials"),
    ("ind_buildingproductsequipment", "Building Products & Equipment"),
    ("ind_businessequipmentsupplies", "Business Equipment & Supplies"),
    ("ind_capitalmarkets", "Capital Markets"),
    ("ind_chemicals", "Chemicals"),
    ("ind_closedendfunddebt", "Closed-End Fund - Debt"),
    ("ind_closedendfundequity", "Closed-End Fund - Equity"),
    ("ind_closedendfundforeign", "Closed-End Fund - Foreign"),
    ("ind_cokingcoal", "Coking Coal"),
    ("ind_communicationequipment", "Communication Equipment"),
    ("ind_computerhardware", "Computer Hardware"),
    ("ind_confectioners", "Confectioners"),
    ("ind_conglomerates", "Conglomerates"),
    ("ind_consultingservices", "Consulting Services"),
    ("ind_consumerelectronics", "Consumer Electronics"),
    ("ind_copper", "Copper"),
    ("ind_creditservices", "Credit Services"),
    ("ind_departmentstores", "Department Stores"),
    ("ind_diagnosticsresearch", "Diagnostics & Research"),
    ("ind_discountstores", "Discount Stores"),
    ("ind_drugmanufacturersgeneral", "Drug Manufacturers - General"),
    ("ind_drugmanufacturersspecialtygeneric", "Drug Manufacturers - Specialty & Generic"),
    ("ind_educationtrainingservices", "Education & Training Services"),
    ("ind_electricalequipmentparts", "Electrical Equipment & Parts"),
    ("ind_electroniccomponents", "Electronic Components"),
    ("ind_electronicgamingmultimedia", "Electronic Gaming & Multimedia"),
    ("ind_electronicscomputerdistribution", "Electronics & Computer Distribution"),
    ("ind_engineeringconstruction", "Engineering & Construction"),
    ("ind_entertainment", "Entertainment"),
    ("ind_farmheavyconstructionmachinery", "Farm & Heavy Construction Machinery"),
    ("ind_farmproducts", "Farm Products"),
    ("ind_financialconglomerates", "Financial Conglomerates"),
    ("ind_financialdatastockexchanges", "Financial Data & Stock Exchanges"),
    ("ind_fooddistribution", "Food Distribution"),
    ("ind_footwearaccessories", "Footwear & Accessories"),
    ("ind_furnishingsfixturesappliances", "Furnishings, Fixtures & Appliances"),
    ("ind_gambling", "Gambling"),
    ("ind_gold", "Gold"),
    ("ind_grocerystores", "Grocery Stores"),
    ("ind_healthcareplans", "Healthcare Plans"),
    ("ind_healthinformationservices", "Health Information Services"),
    ("ind_homeimprovementretail", "Home Improvement Retail"),
    ("ind_householdpersonalproducts", "Household & Personal Products"),
    ("ind_industrialdistribution", "Industrial Distribution"),
    ("ind_informationtechnologyservices", "Information Technology Services"),
    ("ind_infrastructureoperations", "Infrastructure Operations"),
    ("ind_insurancebrokers", "Insurance Brokers"),
    ("ind_insurancediversified", "Insurance - Diversified"),
    ("ind_insurancelife", "Insurance - Life"),
    ("ind_insurancepropertycasualty", "Insurance - Property & Casualty"),
    ("ind_insurancereinsurance", "Insurance - Reinsurance"),
    ("ind_insurancespecialty", "Insurance - Specialty"),
    ("ind_integratedfreightlogistics", "Integrated Freight & Logistics"),
    ("ind_internetcontentinformation", "Internet Content & Information"),
    ("ind_internetretail", "Internet Retail"),
    ("ind_leisure", "Leisure"),
    ("ind_lodging", "Lodging"),
    ("ind_lumberwoodproduction", "Lumber & Wood Production"),
    ("ind_luxurygoods", "Luxury Goods"),
    ("ind_marineshipping", "Marine Shipping"),
    ("ind_medicalcarefacilities", "Medical Care Facilities"),
    ("ind_medicaldevices", "Medical Devices"),
    ("ind_medicaldistribution", "Medical Distribution"),
    ("ind_medicalinstrumentssupplies", "Medical Instruments & Supplies"),
    ("ind_metalfabrication", "Metal Fabrication"),
    ("ind_mortgagefinance", "Mortgage Finance"),
    ("ind_oilgasdrilling", "Oil & Gas Drilling"),
    ("ind_oilgasep", "Oil & Gas E&P"),
    ("ind_oilgasequipmentservices", "Oil & Gas Equipment & Services"),
    ("ind_oilgasintegrated", "Oil & Gas Integrated"),
    ("ind_oilgasmidstream", "Oil & Gas Midstream"),
    ("ind_oilgasrefiningmarketing", "Oil & Gas Refining & Marketing"),
    ("ind_otherindustrialmetalsmining", "Other Industrial Metals & Mining"),
    ("ind_otherpreciousmetalsmining", "Other Precious Metals & Mining"),
    ("ind_packagedfoods", "Packaged Foods"),
    ("ind_packagingcontainers", "Packaging & Containers"),
    ("ind_paperpaperproducts", "Paper & Paper Products"),
    ("ind_personalservices", "Personal Services"),
    ("ind_pharmaceuticalretailers", "Pharmaceutical Retailers"),
    ("ind_pollutiontreatmentcontrols", "Pollution & Treatment Controls"),
    ("ind_publishing", "Publishing"),
    ("ind_railroads", "Railroads"),
    ("ind_realestatedevelopment", "Real Estate - Development"),
    ("ind_realestatediversified", "Real Estate - Diversified"),
    ("ind_realestateservices", "Real Estate Services"),
    ("ind_recreationalvehicles", "Recreational Vehicles"),
    ("ind_reitdiversified", "REIT - Diversified"),
    ("ind_reithealthcarefacilities", "REIT - Healthcare Facilities"),
    ("ind_reithotelmotel", "REIT - Hotel & Motel"),
    ("ind_reitindustrial", "REIT - Industrial"),
    ("ind_reitmortgage", "REIT - Mortgage"),
    ("ind_reitoffice", "REIT - Office"),
    ("ind_reitresidential", "REIT - Residential"),
    ("ind_reitretail", "REIT - Retail"),
    ("ind_reitspecialty", "REIT - Specialty"),
    ("ind_rentalleasingservices", "Rental & Leasing Services"),
    ("ind_residentialconstruction", "Residential Construction"),
    ("ind_resortscasinos", "Resorts & Casinos"),
    ("ind_restaurants", "Restaurants"),
    ("ind_scientifictechnicalinstruments", "Scientific & Technical Instruments"),
    ("ind_securityprotectionservices", "Security & Protection Services"),
    ("ind_semiconductorequipmentmaterials", "Semiconductor Equipment & Materials"),
    ("ind_semiconductors", "Semiconductors"),
    ("ind_shellcompanies", "Shell Companies"),
    ("ind_silver", "Silver"),
    ("ind_softwareapplication", "Software - Application"),
    ("ind_softwareinfrastructure", "Software - Infrastructure"),
    ("ind_solar", "Solar"),
    ("ind_specialtybusinessservices", "Specialty Business Services"),
    ("ind_specialtychemicals", "Specialty Chemicals"),
    ("ind_specialtyindustrialmachinery", "Specialty Industrial Machinery"),
    ("ind_specialtyretail", "Specialty Retail"),
    ("ind_staffingemploymentservices", "Staffing & Employment Services"),
    ("ind_steel", "Steel"),
    ("ind_telecomservices", "Telecom Services"),
    ("ind_textilemanufacturing", "Textile Manufacturing"),
    ("ind_thermalcoal", "Thermal Coal"),
    ("ind_tobacco", "Tobacco"),
    ("ind_toolsaccessories", "Tools & Accessories"),
    ("ind_travelservices", "Travel Services"),
    ("ind_trucking", "Trucking"),
    ("ind_uranium", "Uranium"),
    ("ind_utilitiesdiversified", "Utilities - Diversified"),
    ("ind_utilitiesindependentpowerproducers", "Utilities - Independent Power Producers"),
    ("ind_utilitiesregulatedelectric", "Utilities - Regulated Electric"),
    ("ind_utilitiesregulatedgas", "Utilities - Regulated Gas"),
    ("ind_utilitiesregulatedwater", "Utilities - Regulated Water"),
    ("ind_utilitiesrenewable", "Utilities - Renewable"),
    ("ind_wastemanagement", "Waste Management"),
];

/// Newline-separated industry display names for prompt inclusion
pub fn industry_prompt_list() -> &'static str {
    static LIST: OnceLock<String> = OnceLock::new();
    LIST.get_or_init(|| {
        INDUSTRIES
            .iter()
            .map(|(_, name)| format!("- {name}"))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Map AI-reported industry names to a screener filter value.
///
/// Tries exact display-name matches first, then substring matches, then
/// individual keywords (4+ chars). Returns None when nothing matches.
pub fn industry_filter_for(industries: &[String]) -> Option<&'static str> {
    for industry in industries {
        let needle = industry.to_lowercase();
        if let Some((value, _)) = INDUSTRIES
            .iter()
            .find(|(_, name)| name.to_lowercase() == needle)
        {
            return Some(value);
        }
        if let Some((value, _)) = INDUSTRIES
            .iter()
            .find(|(_, name)| name.to_lowercase().contains(&needle))
        {
            return Some(value);
        }
    }

    let keywords: Vec<String> = industries
        .iter()
        .flat_map(|i| {
            i.to_lowercase()
                .replace(['-', '&', ','], " ")
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|w| w.len() >= 4)
        .collect();

    for keyword in &keywords {
        if let Some((value, _)) = INDUSTRIES
            .iter()
            .find(|(_, name)| name.to_lowercase().contains(keyword.as_str()))
        {
            return Some(value);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_name_match() {
        let filter = industry_filter_for(&["Biotechnology".to_string()]);
        assert_eq!(filter, Some("ind_biotechnology"));
    }

    #[test]
    fn keyword_fallback_match() {
        let filter = industry_filter_for(&["regional banking".to_string()]);
        assert_eq!(filter, Some("ind_banksregional"));
    }

    #[test]
    fn no_match_returns_none() {
        assert_eq!(industry_filter_for(&["xyzzy".to_string()]), None);
    }

    #[test]
    fn prompt_list_contains_display_names() {
        let list = industry_prompt_list();
        assert!(list.contains("- Semiconductors"));
        assert!(!list.contains("ind_semiconductors"));
    }
}
