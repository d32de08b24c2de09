use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct VideoResponse {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub result: Option<VideoResult>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VideoResult {
    pub barcode: String,
    pub name: String,
    pub description: String,
    pub publish_date: String,
    pub img_url: String,
    pub images: Vec<String>,
    pub actors: Vec<Named>,
    pub factories: Vec<Named>,
    pub tags: Vec<Named>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Named {
    pub name: String,
}
