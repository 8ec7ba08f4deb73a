// CountryInfo
// http://download.geonames.org/export/dump/countryInfo.txt
// ISO	ISO3	ISO-Numeric	fips	Country	Capital	Area(in sq km)	Population	Continent	tld	CurrencyCode	CurrencyName	Phone	Postal Code Format	Postal Code Regex	Languages	geonameid	neighbours	EquivalentFipsCode
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Country {
    /// ISO-3166 2-letter country code
    pub code: String,
    pub name: String,
    /// geonames id of the country, only used to link alternate names
    #[serde(skip)]
    pub geonameid: u32,
}

// The main 'geoname' table has the following fields :
// ---------------------------------------------------
// geonameid         : integer id of record in geonames database
// name              : name of geographical point (utf8) varchar(200)
// asciiname         : name of geographical point in plain ascii characters, varchar(200)
// alternatenames    : alternatenames, comma separated, varchar(10000)
// latitude          : latitude in decimal degrees (wgs84)
// longitude         : longitude in decimal degrees (wgs84)
// feature class     : char(1)
// feature code      : varchar(10)
// country code      : ISO-3166 2-letter country code, 2 characters
// cc2               : alternate country codes, comma separated
// admin1 code       : fipscode
// admin2 code       : code for the second administrative division
// admin3 code       : code for third level administrative division
// admin4 code       : code for fourth level administrative division
// population        : bigint (8 byte int)
// elevation         : in meters, integer
// dem               : digital elevation model, integer
// timezone          : the iana timezone id
// modification date : date of last modification in yyyy-MM-dd format
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct City {
    pub id: u32,
    pub country_code: String,
    pub name: String,
    pub population: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<i32>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CityTranslation {
    pub city_id: u32,
    pub lang: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CountryTranslation {
    pub country_code: String,
    pub lang: String,
    pub name: String,
}
