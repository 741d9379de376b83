//! Rendering of raw movie records into the cards exposed as attributes

use ingresso_api::Movie;
use ingresso_core::{DEFAULT_POSTER, NOT_INFORMED};
use serde::{Deserialize, Serialize};

/// Literal the dashboard card replaces with the formatted airdate
pub const RELEASE_TOKEN: &str = "$date";

/// Genre list, or the placeholder text when the API sent none
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Genres {
    List(Vec<String>),
    Missing(String),
}

/// One movie as shown by the upcoming-media dashboard card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieCard {
    pub title: String,
    pub poster: String,
    pub synopsis: String,
    pub director: String,
    pub cast: String,
    pub studio: String,
    pub genres: Genres,
    pub runtime: String,
    pub rating: String,
    pub release: String,
    pub airdate: String,
    pub city: String,
    pub theater: String,
    pub ticket: String,
}

/// Layout record the dashboard card expects as the first element of `data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTemplate {
    pub title_default: String,
    pub line1_default: String,
    pub line2_default: String,
    pub line3_default: String,
    pub line4_default: String,
    pub icon: String,
}

impl Default for DisplayTemplate {
    fn default() -> Self {
        Self {
            title_default: "$title".to_string(),
            line1_default: "$rating".to_string(),
            line2_default: "$release".to_string(),
            line3_default: "$runtime".to_string(),
            line4_default: "$studio".to_string(),
            icon: "mdi:arrow-down-bold".to_string(),
        }
    }
}

fn or_placeholder(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NOT_INFORMED.to_string())
}

impl MovieCard {
    /// Render `movie` for the given city and theater labels
    pub fn from_movie(movie: &Movie, city: &str, theater: &str) -> Self {
        Self {
            title: or_placeholder(&movie.title),
            poster: movie.poster_url().unwrap_or(DEFAULT_POSTER).to_string(),
            synopsis: or_placeholder(&movie.synopsis),
            director: or_placeholder(&movie.director),
            cast: or_placeholder(&movie.cast),
            studio: or_placeholder(&movie.distributor),
            genres: match &movie.genres {
                Some(genres) => Genres::List(genres.clone()),
                None => Genres::Missing(NOT_INFORMED.to_string()),
            },
            runtime: or_placeholder(&movie.duration),
            rating: or_placeholder(&movie.content_rating),
            release: RELEASE_TOKEN.to_string(),
            airdate: movie.premiere_day().unwrap_or(NOT_INFORMED).to_string(),
            city: city.to_string(),
            theater: theater.to_string(),
            ticket: or_placeholder(&movie.site_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn movie(value: serde_json::Value) -> Movie {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_full_record() {
        let movie = movie(json!({
            "title": "Duna: Parte Dois",
            "images": [
                {"url": "https://img.example/duna.jpg", "type": "PosterPortrait"},
                {"url": "https://img.example/duna-h.jpg", "type": "PosterHorizontal"}
            ],
            "synopsis": "Paul Atreides se une a Chani.",
            "director": "Denis Villeneuve",
            "cast": "Timothée Chalamet, Zendaya",
            "distributor": "Warner",
            "genres": ["Ação", "Ficção Científica"],
            "duration": "166",
            "contentRating": "14 anos",
            "premiereDate": {"localDate": "2024-02-29T00:00:00"},
            "siteURL": "https://www.ingresso.com/filme/duna-parte-2"
        }));

        let card = MovieCard::from_movie(&movie, "Recife", "UCI Recife");
        assert_eq!(card.poster, "https://img.example/duna.jpg");
        assert_eq!(card.studio, "Warner");
        assert_eq!(card.runtime, "166");
        assert_eq!(card.rating, "14 anos");
        assert_eq!(card.release, "$date");
        assert_eq!(card.airdate, "2024-02-29");
        assert_eq!(card.theater, "UCI Recife");
        assert_eq!(card.ticket, "https://www.ingresso.com/filme/duna-parte-2");
        assert_eq!(
            serde_json::to_value(&card.genres).unwrap(),
            json!(["Ação", "Ficção Científica"])
        );
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let card = MovieCard::from_movie(&movie(json!({"title": "Kung Fu Panda 4"})), "Recife", "");

        assert_eq!(card.title, "Kung Fu Panda 4");
        assert_eq!(card.poster, DEFAULT_POSTER);
        for field in [
            &card.synopsis,
            &card.director,
            &card.cast,
            &card.studio,
            &card.runtime,
            &card.rating,
            &card.airdate,
            &card.ticket,
        ] {
            assert_eq!(field, NOT_INFORMED);
        }
        assert_eq!(serde_json::to_value(&card.genres).unwrap(), json!(NOT_INFORMED));
    }

    #[test]
    fn test_no_images_uses_fallback_poster() {
        let card = MovieCard::from_movie(
            &movie(json!({
                "title": "X",
                "images": [],
                "premiereDate": {"localDate": "2024-01-05T00:00:00"}
            })),
            "Recife",
            "UCI Recife",
        );
        assert_eq!(card.poster, DEFAULT_POSTER);
        assert_eq!(card.airdate, "2024-01-05");
    }

    #[test]
    fn test_null_premiere_date() {
        let card = MovieCard::from_movie(
            &movie(json!({"premiereDate": {"localDate": null}, "images": []})),
            "Recife",
            "",
        );
        assert_eq!(card.airdate, NOT_INFORMED);
        assert_eq!(card.title, NOT_INFORMED);
    }

    #[test]
    fn test_template_layout() {
        assert_eq!(
            serde_json::to_value(DisplayTemplate::default()).unwrap(),
            json!({
                "title_default": "$title",
                "line1_default": "$rating",
                "line2_default": "$release",
                "line3_default": "$runtime",
                "line4_default": "$studio",
                "icon": "mdi:arrow-down-bold"
            })
        );
    }
}
