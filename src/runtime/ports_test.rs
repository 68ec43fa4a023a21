//! Tests for port publication specs.

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::runtime::{parse_port_specs, PortBinding, PortKey, Protocol};

    fn key(port: u16, protocol: Protocol) -> PortKey {
        PortKey { port, protocol }
    }

    fn binding(ip: &str, port: &str) -> PortBinding {
        PortBinding {
            host_ip: ip.to_string(),
            host_port: port.to_string(),
        }
    }

    #[test]
    fn test_container_port_only() {
        let map = parse_port_specs(&["80"]).unwrap();
        assert_eq!(map[&key(80, Protocol::Tcp)], vec![binding("", "")]);
    }

    #[test]
    fn test_host_and_container_port() {
        let map = parse_port_specs(&["8080:80"]).unwrap();
        assert_eq!(map[&key(80, Protocol::Tcp)], vec![binding("", "8080")]);
    }

    #[test]
    fn test_ip_host_container_and_protocol() {
        let map = parse_port_specs(&["127.0.0.1:5353:53/udp"]).unwrap();
        assert_eq!(map[&key(53, Protocol::Udp)], vec![binding("127.0.0.1", "5353")]);
    }

    #[test]
    fn test_ip_with_dynamic_host_port() {
        let map = parse_port_specs(&["127.0.0.1::80"]).unwrap();
        assert_eq!(map[&key(80, Protocol::Tcp)], vec![binding("127.0.0.1", "")]);
    }

    #[test]
    fn test_bracketed_ipv6() {
        let map = parse_port_specs(&["[::1]:8080:80"]).unwrap();
        assert_eq!(map[&key(80, Protocol::Tcp)], vec![binding("::1", "8080")]);
    }

    #[test]
    fn test_matching_ranges_pair_up() {
        let map = parse_port_specs(&["8000-8001:80-81"]).unwrap();
        assert_eq!(map[&key(80, Protocol::Tcp)], vec![binding("", "8000")]);
        assert_eq!(map[&key(81, Protocol::Tcp)], vec![binding("", "8001")]);
    }

    #[test]
    fn test_host_range_for_single_container_port() {
        let map = parse_port_specs(&["8000-8009:80"]).unwrap();
        assert_eq!(map[&key(80, Protocol::Tcp)], vec![binding("", "8000-8009")]);
    }

    #[test]
    fn test_same_container_port_collects_bindings() {
        let map = parse_port_specs(&["8080:80", "127.0.0.1:9090:80"]).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(
            map[&key(80, Protocol::Tcp)],
            vec![binding("", "8080"), binding("127.0.0.1", "9090")]
        );
    }

    #[test]
    fn test_malformed_specs_are_config_errors() {
        for spec in [
            "",
            "http",
            "0",
            "70000",
            "8080:",
            "1:2:3:4",
            "not-an-ip:8080:80",
            "80/quic",
            "8000-8002:80-81",
            "90-80",
            "[::1:8080:80",
        ] {
            match parse_port_specs(&[spec]) {
                Err(Error::Config(_)) => {}
                other => panic!("spec {:?} should fail, got {:?}", spec, other),
            }
        }
    }

    #[test]
    fn test_port_key_display_and_parse() {
        let k: PortKey = "53/udp".parse().unwrap();
        assert_eq!(k, key(53, Protocol::Udp));
        assert_eq!(k.to_string(), "53/udp");
        assert_eq!("80".parse::<PortKey>().unwrap().to_string(), "80/tcp");
    }
}
