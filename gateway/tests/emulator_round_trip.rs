use sonos_gateway::config::{ControlConfig, DiscoveryConfig, EmulatorConfig};
use sonos_gateway::emulator::Emulator;
use sonos_gateway::models::SpeakerId;
use sonos_gateway::registry::DeviceRegistry;
use sonos_gateway::transport::control::{ControlClient, PlaybackControl};
use sonos_gateway::transport::discovery::Discovery;
use std::time::Duration;

fn start_emulator() -> Emulator {
    Emulator::start(&EmulatorConfig::loopback(&["Living Room", "Kitchen"])).unwrap()
}

fn discovered_registry(emulator: &Emulator) -> DeviceRegistry {
    let config = DiscoveryConfig {
        search_addr: emulator.ssdp_addr(),
        window: Duration::from_secs(1),
        ..DiscoveryConfig::default()
    };
    let registry = DeviceRegistry::new();
    let count = registry.refresh(&Discovery::new(config).unwrap()).unwrap();
    assert_eq!(count, 2);
    registry
}

fn control_client() -> ControlClient {
    ControlClient::new(&ControlConfig {
        request_timeout: Duration::from_secs(2),
        settle_delay: Duration::from_millis(20),
    })
    .unwrap()
}

#[test]
fn test_discover_then_play_on_one_speaker() {
    let emulator = start_emulator();
    let registry = discovered_registry(&emulator);

    let ids: Vec<String> = registry.list().iter().map(|d| d.id.to_string()).collect();
    assert_eq!(ids, vec!["kitchen", "livingroom"]);

    let url = "http://127.0.0.1:8080/tts/a b.mp3?x=1&y=<2>&z=\"3\"";
    let kitchen = registry.lookup(&SpeakerId::from_display_name("kitchen")).unwrap();
    control_client().play_announcement(&kitchen, url).unwrap();

    assert_eq!(emulator.speaker("Kitchen").unwrap().last_media_uri(), url);
    assert_eq!(emulator.speaker("Living Room").unwrap().last_media_uri(), "");
}

#[test]
fn test_later_set_replaces_uri() {
    let emulator = start_emulator();
    let registry = discovered_registry(&emulator);
    let living_room = registry.lookup(&SpeakerId::from_display_name("Living Room")).unwrap();
    let client = control_client();

    client.play_announcement(&living_room, "http://h/first.mp3").unwrap();
    client.play_announcement(&living_room, "http://h/second.mp3").unwrap();

    assert_eq!(emulator.speaker("Living Room").unwrap().last_media_uri(), "http://h/second.mp3");
}

#[test]
fn test_device_description_served() {
    let emulator = start_emulator();
    let kitchen = emulator.speaker("Kitchen").unwrap();
    let url = format!("http://127.0.0.1:{}/xml/device_description.xml", kitchen.port());

    let response = reqwest::blocking::get(&url).unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/xml"));
    let body = response.text().unwrap();
    assert!(body.contains("<roomName>Kitchen</roomName>"));
    assert!(body.contains("<displayName>Kitchen</displayName>"));
    assert!(body.contains("<modelName>Sonos One (Emulated)</modelName>"));
}

#[test]
fn test_unknown_action_still_acknowledged() {
    let emulator = start_emulator();
    let kitchen = emulator.speaker("Kitchen").unwrap();
    let url = format!("http://127.0.0.1:{}/MediaRenderer/AVTransport/Control", kitchen.port());

    let response = reqwest::blocking::Client::new()
        .post(&url)
        .header("SOAPACTION", "\"urn:schemas-upnp-org:service:AVTransport:1#Pause\"")
        .body("<InstanceID>0</InstanceID>")
        .send()
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.text().unwrap().contains("<u:PauseResponse"));
    assert_eq!(kitchen.last_media_uri(), "");
}
