use super::NetCounters;
use crate::error::CollectError;

/// Parse `/proc/net/dev`, summing rx/tx bytes over every interface except
/// loopback. The two header lines have no `iface:` prefix and fall out of
/// the `split_once` below.
pub fn parse_netdev(content: &str) -> Result<NetCounters, CollectError> {
    let mut total = NetCounters::default();

    for line in content.lines() {
        let Some((iface, rest)) = line.split_once(':') else {
            continue;
        };
        let iface = iface.trim();
        if iface.is_empty() || iface == "lo" {
            continue;
        }

        // rx: bytes packets errs drop fifo frame compressed multicast
        // tx: bytes ...
        let fields: Vec<u64> = rest
            .split_whitespace()
            .map_while(|f| f.parse().ok())
            .collect();
        if fields.len() < 9 {
            continue;
        }
        total.rx_bytes = total.rx_bytes.saturating_add(fields[0]);
        total.tx_bytes = total.tx_bytes.saturating_add(fields[8]);
    }

    Ok(total)
}
