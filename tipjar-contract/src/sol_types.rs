//! Solidity types for contract interaction

alloy::sol! {
    interface TipJar {
        struct Donor {
            address donorAddress;
            uint256 amount;
        }

        event Donation(address indexed donor, uint256 amount, uint256 timestamp);
        event Withdrawal(address indexed owner, uint256 amount, uint256 timestamp);

        function donate() external payable;
        function withdraw() external;
        function owner() external view returns (address);
        function getDonation(address donor) external view returns (uint256);
        function donations(address donor) external view returns (uint256);
        function totalDonations() external view returns (uint256);
        function getContractBalance() external view returns (uint256);
        function getTopDonors() external view returns (Donor[3] memory);
        function setDonationPeriod(uint256 start, uint256 end) external;
        function disableTimeRestriction() external;
        function timeRestrictionEnabled() external view returns (bool);
        function startTime() external view returns (uint256);
        function endTime() external view returns (uint256);
    }
}
