//! Index mappings and query DSL builders

use geoconnect_core::{BoundingBox, Location};
use serde_json::{json, Value};

/// Mapping for the posts index
///
/// `user` is a keyword for exact matching, `message` is analyzed text and
/// `location` is a geo point so distance and box filters work.
pub fn posts_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "user":     { "type": "keyword" },
                "message":  { "type": "text" },
                "location": { "type": "geo_point" },
                "url":      { "type": "keyword", "index": false }
            }
        }
    })
}

/// Mapping for the users index
pub fn users_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "username": { "type": "keyword" },
                "password": { "type": "keyword", "index": false },
                "age":      { "type": "integer" },
                "gender":   { "type": "keyword" }
            }
        }
    })
}

fn point(location: &Location) -> Value {
    json!({ "lat": location.lat, "lon": location.lon })
}

/// Posts within `radius_km` of `center`, nearest first
pub fn geo_distance_query(center: &Location, radius_km: f64, limit: usize) -> Value {
    json!({
        "size": limit,
        "query": {
            "bool": {
                "filter": {
                    "geo_distance": {
                        "distance": format!("{radius_km}km"),
                        "location": point(center)
                    }
                }
            }
        },
        "sort": [
            {
                "_geo_distance": {
                    "location": point(center),
                    "order": "asc",
                    "unit": "km"
                }
            }
        ]
    })
}

/// Posts inside a bounding box
pub fn geo_bounding_box_query(area: &BoundingBox, limit: usize) -> Value {
    json!({
        "size": limit,
        "query": {
            "bool": {
                "filter": {
                    "geo_bounding_box": {
                        "location": {
                            "top_left": point(&area.top_left),
                            "bottom_right": point(&area.bottom_right)
                        }
                    }
                }
            }
        }
    })
}

/// Exact match on a keyword field
pub fn term_query(field: &str, value: &str, limit: usize) -> Value {
    json!({
        "size": limit,
        "query": {
            "term": { field: { "value": value } }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_distance_query() {
        let q = geo_distance_query(&Location::new(37.5, 127.0), 200.0, 50);

        assert_eq!(q["size"], 50);
        let filter = &q["query"]["bool"]["filter"]["geo_distance"];
        assert_eq!(filter["distance"], "200km");
        assert_eq!(filter["location"]["lat"], 37.5);
        assert_eq!(filter["location"]["lon"], 127.0);
        assert_eq!(q["sort"][0]["_geo_distance"]["order"], "asc");
    }

    #[test]
    fn test_fractional_distance() {
        let q = geo_distance_query(&Location::new(0.0, 0.0), 1.5, 10);
        assert_eq!(q["query"]["bool"]["filter"]["geo_distance"]["distance"], "1.5km");
    }

    #[test]
    fn test_geo_bounding_box_query() {
        let area =
            BoundingBox::new(Location::new(40.0, -125.0), Location::new(30.0, -115.0)).unwrap();
        let q = geo_bounding_box_query(&area, 20);

        let bbox = &q["query"]["bool"]["filter"]["geo_bounding_box"]["location"];
        assert_eq!(bbox["top_left"]["lat"], 40.0);
        assert_eq!(bbox["bottom_right"]["lon"], -115.0);
    }

    #[test]
    fn test_term_query() {
        let q = term_query("username", "alice", 1);
        assert_eq!(q["size"], 1);
        assert_eq!(q["query"]["term"]["username"]["value"], "alice");
    }

    #[test]
    fn test_mappings() {
        assert_eq!(
            posts_mapping()["mappings"]["properties"]["location"]["type"],
            "geo_point"
        );
        assert_eq!(
            users_mapping()["mappings"]["properties"]["username"]["type"],
            "keyword"
        );
    }
}
