//! Parsing of generated CAP bulletins through both layers.

use cap_parser::{parse_document, Node, OneOrMany, RawBulletin};
use test_utils::{cap_alert_xml, polygons, InfoFixture};

#[test]
fn test_single_info_is_scalar_object() {
    let xml = cap_alert_xml("single", &[InfoFixture::new("Viento", "Severe").area("Galicia")]);
    let doc = parse_document(&xml).unwrap();
    let info = doc.get("alert").unwrap().get("info").unwrap();

    assert!(matches!(info, Node::Element(_)));
    assert!(matches!(info.one_or_many(), OneOrMany::One(_)));
}

#[test]
fn test_two_infos_are_sequence() {
    let xml = cap_alert_xml(
        "pair",
        &[
            InfoFixture::new("Viento", "Severe").area("Galicia"),
            InfoFixture::new("Wind", "Severe").language("en-GB").area("Galicia"),
        ],
    );
    let doc = parse_document(&xml).unwrap();
    let info = doc.get("alert").unwrap().get("info").unwrap();

    match info.one_or_many() {
        OneOrMany::Many(items) => assert_eq!(items.len(), 2),
        OneOrMany::One(_) => panic!("expected two info blocks"),
    }
}

#[test]
fn test_typed_view_is_shape_independent() {
    let one = cap_alert_xml("a", &[InfoFixture::new("Nevadas", "Extreme").area("Pirineo")]);
    let two = cap_alert_xml(
        "b",
        &[
            InfoFixture::new("Nevadas", "Extreme").area("Pirineo"),
            InfoFixture::new("Snow", "Extreme").language("en-GB").area("Pyrenees"),
        ],
    );

    let one = RawBulletin::from_document(&parse_document(&one).unwrap()).unwrap();
    let two = RawBulletin::from_document(&parse_document(&two).unwrap()).unwrap();

    assert_eq!(one.infos.len(), 1);
    assert_eq!(two.infos.len(), 2);
    assert_eq!(one.infos[0].areas.len(), 1);
    assert_eq!(two.infos[1].areas[0].area_desc.as_deref(), Some("Pyrenees"));
}

#[test]
fn test_area_polygons_decoded() {
    let xml = cap_alert_xml(
        "poly",
        &[InfoFixture::new("Lluvias", "Severe")
            .area_with_polygon("Sierra de Madrid", polygons::MADRID)
            .area_with_polygon("Degenerada", polygons::DEGENERATE)],
    );
    let bulletin = RawBulletin::from_document(&parse_document(&xml).unwrap()).unwrap();
    let areas = &bulletin.infos[0].areas;

    assert_eq!(areas[0].rings()[0].len(), 5);
    assert!(areas[1].has_polygon());
    assert!(areas[1].rings().is_empty());
}

#[test]
fn test_area_with_several_polygons_decoded() {
    let xml = cap_alert_xml(
        "multi",
        &[InfoFixture::new("Costeros", "Moderate")
            .area_with_polygons("Litoral", &[polygons::GALICIA, polygons::PYRENEES])],
    );
    let bulletin = RawBulletin::from_document(&parse_document(&xml).unwrap()).unwrap();
    let area = &bulletin.infos[0].areas[0];

    assert_eq!(area.polygons.len(), 2);
    assert_eq!(area.rings().len(), 2);
}

#[test]
fn test_raw_info_serializes_with_source_keys() {
    let xml = cap_alert_xml(
        "json",
        &[InfoFixture::new("Viento", "Moderate").area("Costa de Galicia")],
    );
    let bulletin = RawBulletin::from_document(&parse_document(&xml).unwrap()).unwrap();
    let json = serde_json::to_value(&bulletin.infos[0].raw).unwrap();

    assert_eq!(json["event"], "Viento");
    assert_eq!(json["severity"], "Moderate");
    assert_eq!(json["area"]["areaDesc"], "Costa de Galicia");
}
