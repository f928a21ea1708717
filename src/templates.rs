//! Configuration file templates written to the target host.
//!
//! Every template starts with a newline; rendered files keep it.

/// Replaced with the target's release codename in [`TOR_SOURCES_LIST`].
pub const DISTRIBUTION: &str = "###DISTRIBUTION###";
/// Replaced with the ORPort in [`CONFIG_TORRC`].
pub const OR_PORT: &str = "###TODO1###";
/// Replaced with the obfs4 listen port in [`CONFIG_TORRC`].
pub const TRANSPORT_PORT: &str = "###TODO2###";
/// Replaced with the operator contact in [`CONFIG_TORRC`].
pub const CONTACT_INFO: &str = "###CONTACTINFO###";
/// Reserved for a bridge nickname; currently never bound.
pub const NICKNAME: &str = "###NICKNAME###";

pub const UNATTENDED_UPGRADES_PATH: &str = "/etc/apt/apt.conf.d/50unattended-upgrades";
pub const AUTO_UPGRADES_PATH: &str = "/etc/apt/apt.conf.d/20auto-upgrades";
pub const TOR_SOURCES_LIST_PATH: &str = "/etc/apt/sources.list.d/tor.list";
pub const TORRC_PATH: &str = "/etc/tor/torrc";
pub const TOR_DEFAULT_UNIT_PATH: &str = "/lib/systemd/system/tor@default.service";
pub const TOR_INSTANCE_UNIT_PATH: &str = "/lib/systemd/system/tor@.service";

/// Security updates from Debian and the Tor Project, with automatic reboot.
pub const UNATTENDED_UPGRADES_CFG: &str = r#"
Unattended-Upgrade::Origins-Pattern {
    "origin=Debian,codename=${distro_codename},label=Debian-Security";
    "origin=TorProject";
};
Unattended-Upgrade::Package-Blacklist {
};
Unattended-Upgrade::Automatic-Reboot "true";
"#;

pub const UNATTENDED_AUTO_CFG: &str = r#"
APT::Periodic::Update-Package-Lists "1";
APT::Periodic::AutocleanInterval "5";
APT::Periodic::Unattended-Upgrade "1";
APT::Periodic::Verbose "1";
"#;

pub const TOR_SOURCES_LIST: &str = "
deb     [signed-by=/usr/share/keyrings/tor-archive-keyring.gpg] https://deb.torproject.org/torproject.org ###DISTRIBUTION### main
deb-src [signed-by=/usr/share/keyrings/tor-archive-keyring.gpg] https://deb.torproject.org/torproject.org ###DISTRIBUTION### main
";

pub const CONFIG_TORRC: &str = r#"
BridgeRelay 1

# Replace "TODO1" with a Tor port of your choice.
# This port must be externally reachable.
# Avoid port 9001 because it's commonly associated with Tor and censors may be scanning the Internet for this port.
ORPort ###TODO1###

ServerTransportPlugin obfs4 exec /usr/bin/obfs4proxy

# Replace "TODO2" with an obfs4 port of your choice.
# This port must be externally reachable and must be different from the one specified for ORPort.
# Avoid port 9001 because it's commonly associated with Tor and censors may be scanning the Internet for this port.
ServerTransportListenAddr obfs4 0.0.0.0:###TODO2###

# Local communication port between Tor and obfs4.  Always set this to "auto".
# "Ext" means "extended", not "external".  Don't try to set a specific port number, nor listen on 0.0.0.0.
ExtORPort auto

# Replace "<address@email.com>" with your email address so we can contact you if there are problems with your bridge.
# This is optional but encouraged.
ContactInfo <###CONTACTINFO###>

# Pick a nickname that you like for your bridge.  This is optional.
#Nickname ###NICKNAME###
"#;
